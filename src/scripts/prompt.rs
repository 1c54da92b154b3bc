use super::repo_types::ScriptInputs;

/// Sections every script is asked to contain, in order.
pub const DEFAULT_SECTIONS: [&str; 6] = [
    "Opening Hook",
    "Problem Statement",
    "Solution/Product Introduction",
    "Key Benefits/Features",
    "Social Proof/Testimonials",
    "Call to Action",
];

/// Used when the caller leaves `callToAction` blank.
pub const DEFAULT_CALL_TO_ACTION: &str = "Get started today!";

const SECTION_TIMINGS: [&str; 6] = [
    "15-20 seconds",
    "20-30 seconds",
    "30-40 seconds",
    "30-40 seconds",
    "20-30 seconds",
    "15-20 seconds",
];

fn call_to_action(inputs: &ScriptInputs) -> &str {
    inputs
        .call_to_action
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CALL_TO_ACTION)
}

fn section_list(sections: &[String]) -> String {
    sections
        .iter()
        .map(|name| match DEFAULT_SECTIONS.iter().position(|d| d == name) {
            Some(p) => format!("   {name} ({})\n", SECTION_TIMINGS[p]),
            None => format!("   {name}\n"),
        })
        .collect()
}

fn body(inputs: &ScriptInputs, sections: &[String], count: usize, first_number: usize) -> String {
    let last = first_number + count - 1;
    format!(
        "Tone: {tone}\n\
         Style: {style}\n\
         Call to Action: {cta}\n\
         \n\
         Requirements for each script:\n\
         1. Each script should be 2-3 minutes long\n\
         2. Break down each script into these sections with clear formatting:\n\
         {sections}\
         \n\
         For each section, include these elements on separate lines:\n\
         Visual: [Description of what viewers see]\n\
         Music: [Description of background music]\n\
         Voice: [Description of narration style]\n\
         Action: [Description of what happens]\n\
         \n\
         Format Guidelines:\n\
         - Do not use asterisks (*) or quotes\n\
         - Do not use special characters\n\
         - Keep text clean and direct\n\
         - Use clear section headers\n\
         - Use consistent formatting across all scripts\n\
         - Separate sections with line breaks\n\
         - Text overlays should be written as: Text: [content]\n\
         \n\
         Start each script on a new line with its number and a short title, \
         exactly like \"Script {first_number}: <title>\", numbering them from \
         Script {first_number} to Script {last}.",
        tone = inputs.tone,
        style = inputs.ad_style,
        cta = call_to_action(inputs),
        sections = section_list(sections),
    )
}

/// Prompt for the first generation call.
pub fn build_prompt(inputs: &ScriptInputs, sections: &[String], count: usize) -> String {
    format!(
        "As a Facebook marketing strategist, I understand how to craft compelling video ads \
         that captivate and convert. Generate {count} different video advertising scripts for \
         {product} targeting {audience} with a {tone} tone and {style} style.\n\n{body}",
        product = inputs.product_name,
        audience = inputs.target_audience,
        tone = inputs.tone,
        style = inputs.ad_style,
        body = body(inputs, sections, count, 1),
    )
}

/// Prompt for the single top-up call asking for the `remaining` scripts still missing
/// after `already` usable ones.
pub fn build_supplement_prompt(
    inputs: &ScriptInputs,
    sections: &[String],
    already: usize,
    remaining: usize,
) -> String {
    format!(
        "As a Facebook marketing strategist, generate {remaining} more distinct video \
         advertising scripts for {product} targeting {audience} with a {tone} tone and \
         {style} style. {already} scripts already exist, so do not repeat earlier ideas.\n\n{body}",
        product = inputs.product_name,
        audience = inputs.target_audience,
        tone = inputs.tone,
        style = inputs.ad_style,
        body = body(inputs, sections, remaining, already + 1),
    )
}
