use clauselens_core::Chunk;

const HINT_CHARS: usize = 80;

/// `<source> p.<start>-<end> | <first 80 chars of the section hint>`
pub fn format_citation(chunk: &Chunk) -> String {
    let hint: String = chunk.section_hint.chars().take(HINT_CHARS).collect();
    format!(
        "{} p.{}-{} | {}",
        chunk.source, chunk.page_start, chunk.page_end, hint
    )
}
