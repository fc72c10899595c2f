//! Prompt construction and generation for the two pipeline stages.
//!
//! - [`summarize`] asks for a numbered list of one-sentence test-case descriptions.
//! - [`generate_code`] asks for one runnable test in the configured framework.
//!
//! The generation service gives no formatting guarantee, so both answers pass a
//! validation step before being handed back. An answer left empty once markdown
//! formatting is removed fails with [`GenerationError`] instead of reaching callers.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error, info};

use crate::config::PromptConfig;
use crate::contract::{FileContent, GeneratedArtifact, TextGenerator};
use crate::error::{GenerationError, PipelineError};

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\*\*|__)?(?:\d+[.)]|[-*•])(?:\*\*|__)?\s+\S").expect("static regex"))
}

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[^\n]*\n(.*?)```").expect("static regex"))
}

pub fn build_summary_prompt(files: &[FileContent]) -> String {
    let mut combined = String::new();
    for file in files {
        combined.push_str(&format!(
            "\n---\nFile Path: {}\n---\n{}",
            file.source_url, file.text
        ));
    }
    format!(
        "You are an expert test case writer for a software development team.\n\
         Based on the content of the following code files, provide a numbered list of short, \
         one-sentence summaries for potential test cases.\n\
         Focus on functionality, edge cases, and potential errors.\n\
         {combined}\n\n\
         Please provide only the numbered list of summaries.\n"
    )
}

pub fn build_code_prompt(files: &[FileContent], summary: &str, framework: &str) -> String {
    let mut combined = String::new();
    for file in files {
        combined.push_str(&format!("\n---\nFile Content\n---\n{}", file.text));
    }
    format!(
        "You are an expert software engineer specializing in automated testing.\n\
         Your task is to write a complete, runnable test case.\n\
         Based on the provided code files and the specific test case summary, generate the code \
         using the {framework} framework.\n\
         Provide only the raw code for the test file. Do not include any explanation, comments, \
         or markdown formatting like ```javascript.\n\n\
         CONTEXT:\n{combined}\n\n\
         REQUESTED TEST CASE:\n\"{summary}\"\n\n\
         Generate the {framework} code now.\n"
    )
}

/// Generates the ordered set of test-case summaries for `files`.
pub async fn summarize<G>(generator: &G, files: &[FileContent]) -> Result<Vec<String>, PipelineError>
where
    G: TextGenerator + ?Sized,
{
    let prompt = build_summary_prompt(files);
    info!(files = files.len(), prompt_len = prompt.len(), "[SUMMARY] Requesting test case summaries");

    let text = generator.generate(&prompt).await.map_err(|e| {
        error!(error = %e, "[SUMMARY][ERROR] Generation call failed");
        e
    })?;
    let summaries = parse_summaries(&text).map_err(|e| {
        error!(error = %e, response_len = text.len(), "[SUMMARY][ERROR] Response rejected");
        e
    })?;

    info!(count = summaries.len(), "[SUMMARY] Summaries generated");
    Ok(summaries)
}

/// Generates test code for `summary` against `files`.
pub async fn generate_code<G>(
    generator: &G,
    config: &PromptConfig,
    files: &[FileContent],
    summary: &str,
) -> Result<GeneratedArtifact, PipelineError>
where
    G: TextGenerator + ?Sized,
{
    let prompt = build_code_prompt(files, summary, &config.framework);
    info!(
        files = files.len(),
        framework = %config.framework,
        prompt_len = prompt.len(),
        "[CODE] Requesting test code"
    );

    let text = generator.generate(&prompt).await.map_err(|e| {
        error!(error = %e, "[CODE][ERROR] Generation call failed");
        e
    })?;
    let code = extract_code(&text).map_err(|e| {
        error!(error = %e, response_len = text.len(), "[CODE][ERROR] Response rejected");
        e
    })?;

    info!(code_len = code.len(), "[CODE] Test code generated");
    Ok(GeneratedArtifact {
        summary: summary.to_string(),
        code,
    })
}

/// Splits a list-shaped response into items.
///
/// Blank lines and fence markers are dropped, and `**` bold markers are removed.
/// When some lines are list items (bold ones included), prose around them such as a
/// "Here are some tests:" preamble is dropped too. A response with no list markers
/// at all is taken one item per line.
pub fn parse_summaries(text: &str) -> Result<Vec<String>, GenerationError> {
    if text.trim().is_empty() {
        return Err(GenerationError::Empty);
    }

    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("```"))
        .collect();

    let listed: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| list_item_re().is_match(l))
        .collect();
    let kept = if listed.is_empty() {
        debug!(lines = lines.len(), "No list markers in summary response, keeping plain lines");
        lines
    } else {
        listed
    };

    let items: Vec<String> = kept
        .into_iter()
        .map(|l| l.replace("**", "").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if items.is_empty() {
        return Err(GenerationError::Malformed(
            "summary response contains only formatting".into(),
        ));
    }
    Ok(items)
}

/// Pulls the code out of a generation response.
///
/// A response opening with a fence is unwrapped from it. Otherwise a fenced block is
/// only taken when everything around it reads as prose. A fence that sits inside the
/// code (a markdown template literal, say) leaves the response untouched.
pub fn extract_code(text: &str) -> Result<String, GenerationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GenerationError::Empty);
    }

    let code = if text.starts_with("```") {
        unwrap_leading_fence(text)
    } else {
        prose_wrapped_block(text).unwrap_or_else(|| text.to_string())
    };

    if code.is_empty() {
        return Err(GenerationError::Malformed(
            "code response is empty after removing formatting".into(),
        ));
    }
    Ok(code)
}

/// Drops the opening fence line and the closing fence, which is the last bare fence
/// line followed only by prose. Without one the code runs to the end of the response.
fn unwrap_leading_fence(text: &str) -> String {
    let body: Vec<&str> = text.lines().skip(1).collect();
    let end = body
        .iter()
        .rposition(|l| l.trim() == "```")
        .filter(|&i| body[i + 1..].iter().all(|l| is_prose(l)))
        .unwrap_or(body.len());
    body[..end].join("\n").trim().to_string()
}

fn prose_wrapped_block(text: &str) -> Option<String> {
    let caps = fenced_block_re().captures(text)?;
    let (whole, body) = (caps.get(0)?, caps.get(1)?);
    let mut outside = text[..whole.start()].lines().chain(text[whole.end()..].lines());
    if outside.all(is_prose) {
        Some(body.as_str().trim().to_string())
    } else {
        None
    }
}

fn is_prose(line: &str) -> bool {
    !line.contains([';', '{', '}', '=', '`'])
}
