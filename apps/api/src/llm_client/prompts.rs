// Cross-cutting prompt fragments shared by the stage producers.
// Stage-specific role/goal text lives in agents::prompts.

/// Appended to every task whose answer must be machine-readable.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
