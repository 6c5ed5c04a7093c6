//! Prompt templates for the context layer.

use tutor_types::RetrievedItem;

pub(crate) fn context_queries_prompt(query: &str, history: &str, topic: &str) -> String {
    format!(
        r#"You are an expert Context Query Generator for an educational chatbot. Your job is to analyze the user's query, the recent chat history and the topic of conversation, and decide on the 1 to 3 most relevant queries to retrieve context from the knowledge base.

Each query should be a single topic or phrase that is relevant to the topic of conversation and whose answer or context is not already present in the chat history.
Do not rely on your own knowledge, only on the chat history and the user's query.

The queries must be unique and must not overlap with each other. They should be specific to the topic of conversation and not too broad. In most cases only 1 query should be generated, unless the user's query is very broad.

Your output should be a JSON object with a single key "queries" whose value is a list of strings.

**Example:**

**Chat History:**
User: "Hey, can you help me study for my CS exam?"
Bot: "Of course! What topic are you focusing on today?"

**User Query:**
"How do you traverse a singly linked list?"

**Topic:**
"Linked Lists"

**Output:**
```json
{{
  "queries": ["Singly Linked List", "Linked List Traversal"]
}}
```

-----

**Chat History:**
{history}

**User Query:**
{query}

**Topic:**
{topic}

**Output:**
"#
    )
}

pub(crate) fn context_summary_prompt(
    query: &str,
    history: &str,
    topic: &str,
    context_query: &str,
    items: &[RetrievedItem],
) -> String {
    let fetched: String = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("[{}] {}", i + 1, item.passage.trim()))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are an expert Context Summarizer for an educational chatbot. Your job is to read the user's query, the recent chat history and the topic of conversation, and extract and summarize only the most relevant information from context retrieved from the knowledge base.

**Important Instructions:**
- Do NOT summarize or repeat the user query or the chat history.
- Use the user query and chat history only as background to understand what information is relevant to the current conversation.
- Focus solely on the fetched context: extract the key facts, explanations or data that directly address the user's needs.
- Filter out irrelevant, redundant or generic information that is not useful for the current conversation.
- Keep the summary concise and focused, and do not include information already present in the chat history or user query.

Your output should be a JSON object with a single key "summary" whose value is a string:

```json
{{
    "summary": "<summary of the relevant information from the fetched context>"
}}
```

**User Query:**
{query}

**Chat History:**
{history}

**Topic:**
{topic}

**Context Query:**
{context_query}

**Fetched Context to be summarized:**
{fetched}

**Output:**
"#
    )
}
