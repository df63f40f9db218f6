use std::collections::BTreeMap;

pub const DEFAULT_PROMPT: &str = "You are organising a folder of screenshots. \
Look at the screenshot and decide which category it belongs to and what it should be called. \
The filename must be short (2 to 6 words), lowercase, kebab-case, and describe what is on screen. \
Do not include a date or a file extension.";

pub fn default_categories() -> BTreeMap<String, String> {
    [
        ("web", "Websites, web apps and browser windows"),
        ("code", "Source code, terminals, IDEs and stack traces"),
        ("chat", "Messaging, email and social media conversations"),
        ("docs", "Documents, PDFs, slides and spreadsheets"),
        ("design", "Design tools, mockups, photos and illustrations"),
        ("other", "Anything that fits none of the other categories"),
    ]
    .into_iter()
    .map(|(name, description)| (name.to_string(), description.to_string()))
    .collect()
}

/// Full instruction text sent with every image, for both call stages.
pub fn build_prompt(base: &str, categories: &BTreeMap<String, String>) -> String {
    let mut prompt = String::from(base.trim());
    prompt.push_str("\n\nCategories:\n");
    for (name, description) in categories {
        prompt.push_str(&format!("- {}: {}\n", name, description));
    }
    prompt.push_str(
        "\nRespond with a JSON object of the form \
        {\"category\": \"<one of the categories above>\", \"filename\": \"<suggested-name>\"}. \
        Omit \"category\" if none of the categories fit.",
    );
    prompt
}
