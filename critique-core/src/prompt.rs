use crate::model::Bug;

/// System instruction for the analysis call.
///
/// Describes the exact JSON shape the service must reply with; the reply is
/// still treated as untrusted and normalized by the validator.
pub fn analysis_instruction(language: &str) -> String {
    format!(
        r#"You are an expert code reviewer and bug finder for {language} code.
Analyze the following code and provide:
1. A quality score from 0-100
2. A list of bugs or issues with line numbers, severity (high/medium/low), and suggestions for fixing
3. General suggestions for improving the code

Format your response as a JSON object with the following structure:
{{
    "quality_score": <score>,
    "bugs": [
        {{
            "line": <line_number>,
            "severity": "<severity>",
            "message": "<description of the issue>",
            "suggestion": "<how to fix it>"
        }}
    ],
    "suggestions": ["<general improvement suggestion>", ...]
}}"#
    )
}

/// System instruction for the fix call, embedding the known bug list.
pub fn fix_instruction(language: &str, bugs: &[Bug]) -> String {
    format!(
        r#"You are an expert code fixer for {language} code.
Fix the following code based on the identified bugs.

BUGS TO FIX:
{}

Provide:
1. The complete fixed code
2. A brief explanation of the changes made

Format your response as a JSON object with the following structure:
{{
    "fixed_code": "<complete fixed code>",
    "explanation": "<explanation of changes>"
}}"#,
        describe_bugs(bugs)
    )
}

/// Render a bug list as one numbered line per bug.
pub fn describe_bugs(bugs: &[Bug]) -> String {
    let mut out = String::new();
    for (i, bug) in bugs.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "Bug {} (Line {}, {}): {}. Suggestion: {}",
            i + 1,
            bug.line,
            bug.severity.as_str(),
            bug.message,
            bug.suggestion
        ));
    }
    out
}
