pub const SYSTEM_POLICY: &str = include_str!("../data/prompts/system_policy.txt");
pub const ANALYZE_IMAGE: &str = include_str!("../data/prompts/analyze_image.txt");
pub const FROM_INGREDIENTS: &str = include_str!("../data/prompts/from_ingredients.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
