//! Prompt assembly and reply parsing for line-oriented LLM translation.

use std::fmt::Write as _;

use crate::types::TranslationContext;

/// Stands in for a line break inside one text, so each text stays on a
/// single prompt line and a single reply line.
pub const LINE_BREAK: &str = "[[BR]]";

/// Build the user prompt for a batch.
///
/// Texts are numbered from 1; the model is asked to answer with one
/// translation per line, in order, without numbering. Line breaks inside a
/// text are sent as [`LINE_BREAK`].
pub fn build_prompt(texts: &[String], context: &TranslationContext) -> String {
    let mut prompt = format!(
        "You are a professional user-interface translator. Translate the following texts \
         from \"{}\" to \"{}\".\n\n\
         These are UI strings (buttons, headings, messages).\n\n\
         Rules:\n\
         - Keep structure and formatting\n\
         - Use established interface terminology\n\
         - If a text is already in the target language, keep it unchanged\n\
         - Be brief and clear\n\
         - Keep every {LINE_BREAK} marker where it is; it is a line break inside one text",
        context.from_lang, context.to_lang
    );

    if let Some(notes) = &context.glossary_context {
        let _ = write!(prompt, "\n\nContext:\n{notes}");
    }

    if !context.glossary.is_empty() {
        prompt.push_str("\n\nGlossary:");
        for (term, translation) in &context.glossary {
            let _ = write!(prompt, "\n- \"{term}\" → \"{translation}\"");
        }
    }

    if !context.style.is_plain() {
        prompt.push_str("\n\nEditorial rules:");
        if context.style.informal_tone {
            prompt.push_str("\n- Address the user informally");
        }
        if context.style.prefer_short_forms {
            prompt.push_str("\n- Prefer short, compact wording");
        }
    }

    if let Some(custom) = &context.custom_prompt {
        let _ = write!(prompt, "\n\nAdditional instructions:\n{custom}");
    }

    prompt.push_str("\n\nTexts to translate:");
    for (i, text) in texts.iter().enumerate() {
        let _ = write!(prompt, "\n{}. {}", i + 1, encode_breaks(text));
    }
    prompt.push_str(
        "\n\nReturn ONLY the translations in the same order, one per line, \
         without numbering or comments:",
    );
    prompt
}

/// Split a model reply into translation lines.
///
/// Lines are trimmed and blank lines dropped. A leading `"{n}. "` is removed
/// when `n` is exactly the line's position, which undoes models echoing the
/// prompt's numbering without touching texts that merely start with digits.
/// [`LINE_BREAK`] markers become `\n` again.
pub fn parse_lines(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| decode_breaks(strip_numbering(line, i + 1)))
        .collect()
}

fn encode_breaks(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', LINE_BREAK)
}

fn decode_breaks(line: &str) -> String {
    line.split(LINE_BREAK)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_numbering(line: &str, expected: usize) -> &str {
    let prefix = format!("{expected}. ");
    line.strip_prefix(prefix.as_str()).unwrap_or(line)
}
