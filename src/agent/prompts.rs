use crate::search::types::Document;

use super::slots::SlotState;

/// Prompt asking for a handful of search queries as a JSON array.
pub fn generate_queries(question: &str, today: &str) -> String {
    format!(
        r#"You are a research assistant. Today's date is {today}.
Break the question below into 3-5 specific web search queries.

Question: {question}

Good queries:
- are specific and focused
- use different keywords and angles
- together cover every aspect of the question
- are likely to return relevant results

Reply with ONLY a JSON array of strings. No prose, no markdown, no code fences:
["query 1", "query 2", "query 3"]"#
    )
}

/// Prompt for the slot-aware sufficiency check.
pub fn reflect(question: &str, docs: &[Document]) -> String {
    let docs_text = if docs.is_empty() {
        "No search results found.".to_string()
    } else {
        docs.iter()
            .enumerate()
            .map(|(i, d)| {
                format!(
                    "DOCUMENT {}:\nTitle: {}\nContent: {}\nURL: {}\n",
                    i + 1,
                    or_placeholder(&d.title, "No title"),
                    or_placeholder(&d.snippet, "No snippet"),
                    or_placeholder(&d.url, "No URL"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are judging whether the search results below are enough to answer a question completely.

Question: {question}

Search results:
{docs_text}

STEP 1 - Declare the mandatory information slots.
List every piece of information a complete answer must contain. Typical slots:
- WHO: winner, loser, participants, key_people, organization
- WHAT: definition, description, features, components
- WHEN: date, time_period, duration, year
- WHERE: location, venue, country, region
- HOW: method, process, steps, mechanism
- WHY: cause, reason, purpose
Examples:
- "Who won the 2022 World Cup?" -> ["winner", "opponent", "score", "date", "venue"]
- "What is machine learning?" -> ["definition", "types", "applications"]

STEP 2 - Match evidence to slots.
A slot is filled only when the results contain a clear, consistent statement for it.
Conflicting, partial or unclear evidence leaves the slot unfilled.

STEP 3 - Decide.
- Every slot filled with consistent evidence -> need_more = false
- Any slot unfilled -> need_more = true, and write targeted queries for exactly the missing information

Reply with ONLY a JSON object in this format. No prose, no markdown, no code fences:
{{
  "slots": ["slot1", "slot2", "slot3"],
  "filled": ["slot1"],
  "need_more": true,
  "new_queries": ["targeted query for slot2", "targeted query for slot3"]
}}"#
    )
}

/// Prompt for the final cited answer.
pub fn synthesize(question: &str, slots: &SlotState, docs: &[Document]) -> String {
    let docs_text = if docs.is_empty() {
        "No search results found.".to_string()
    } else {
        docs.iter()
            .enumerate()
            .map(|(i, d)| {
                format!(
                    "{}. {}\n   {}\n   URL: {}\n",
                    i + 1,
                    or_placeholder(&d.title, "No title"),
                    or_placeholder(&d.snippet, "No snippet"),
                    or_placeholder(&d.url, "No URL"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are a research assistant. Answer the question directly and concisely from the search results.

Question: {question}
Required slots: {declared:?}
Filled slots: {filled:?}

Search results:
{docs_text}

Rules:
- At most 80 words.
- Lead with the fact that answers the question.
- Do not open with "Based on the search results" or similar.
- Only state what the results support.
- End with numbered markers [1][2] referring to the sources you used.

Example: "Argentina won the 2022 FIFA World Cup, beating France on penalties after a 3-3 draw in extra time.[1]"

Reply with ONLY a JSON object in this format. No prose, no markdown, no code fences:
{{
  "answer": "Direct answer with [1][2] markers",
  "citations": [
    {{"id": 1, "title": "Source title", "url": "https://example.com/source"}}
  ]
}}
Each citation id must match a marker in the answer."#,
        declared = slots.declared,
        filled = slots.filled,
    )
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_lists_documents() {
        let docs = vec![Document::new("Python", "", "https://python.org", "q")];
        let prompt = reflect("What is Python?", &docs);
        assert!(prompt.contains("DOCUMENT 1:\nTitle: Python\nContent: No snippet\nURL: https://python.org"));
        assert!(prompt.contains("\"need_more\": true"));
    }

    #[test]
    fn test_synthesize_without_documents() {
        let prompt = synthesize("q", &SlotState::default(), &[]);
        assert!(prompt.contains("No search results found."));
        assert!(prompt.contains("Required slots: []"));
    }
}
