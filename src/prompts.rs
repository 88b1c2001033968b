pub const RESTYLE: &str = include_str!("../data/prompts/restyle.txt");
pub const REFINE: &str = include_str!("../data/prompts/refine.txt");
pub const REFINE_ACK: &str = include_str!("../data/prompts/refine_ack.txt");
pub const DESIGNER_SYSTEM: &str = include_str!("../data/prompts/designer_system.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
