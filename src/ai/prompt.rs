/// Join retrieved passages with blank lines and cut the result to
/// `char_limit` characters.
pub fn build_context(passages: &[String], char_limit: usize) -> String {
    let joined = passages.join("\n\n");
    match joined.char_indices().nth(char_limit) {
        Some((byte_index, _)) => joined[..byte_index].to_string(),
        None => joined,
    }
}

pub fn build_prompt(question: &str, context: &str, username: &str) -> String {
    format!(
        "Use only the context below to answer the question. Personalize the response for {username}.

Context:
{context}

Question: {question}
Answer:
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_joined_with_blank_lines() {
        let passages = vec!["Mint cools.".to_string(), "Sage warms.".to_string()];
        assert_eq!(build_context(&passages, 10_000), "Mint cools.\n\nSage warms.");
    }

    #[test]
    fn context_truncates_on_char_boundaries() {
        let passages = vec!["é".repeat(20)];
        let context = build_context(&passages, 7);
        assert_eq!(context.chars().count(), 7);
        assert_eq!(build_context(&[], 7), "");
    }

    #[test]
    fn prompt_embeds_all_parts() {
        let prompt = build_prompt("What is nettle?", "Nettle is a plant.", "Ada");

        assert!(prompt.starts_with("Use only the context below to answer the question. Personalize the response for Ada."));
        assert!(prompt.contains("Context:\nNettle is a plant.\n\nQuestion: What is nettle?\nAnswer:\n"));
    }
}
