//! Persona conversations outside the corpus: a multi-turn tutor, a one-shot
//! expert explainer, and a daily journal.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;
use tracing::{debug, info};

use lectern_chat::{collect_text, BoxedStream, ChatMessage, ChatPromptTemplate, LanguageModel, PromptTemplate};
use lectern_core::Result;

pub const TUTOR_PERSONA: &str =
    "You are a helpful assistant and you play the role of a personal tutor. Be nice and polite.";

/// Exchanges kept by default; older ones are dropped first.
pub const DEFAULT_MAX_EXCHANGES: usize = 20;

/// A system persona plus the running user/assistant history.
pub struct Conversation {
    llm: Arc<dyn LanguageModel>,
    persona: ChatMessage,
    turns: Vec<ChatMessage>,
    max_exchanges: usize,
}

impl Conversation {
    pub fn new(llm: Arc<dyn LanguageModel>, persona: impl Into<String>) -> Self {
        Self {
            llm,
            persona: ChatMessage::system(persona),
            turns: Vec::new(),
            max_exchanges: DEFAULT_MAX_EXCHANGES,
        }
    }

    pub fn tutor(llm: Arc<dyn LanguageModel>) -> Self {
        Self::new(llm, TUTOR_PERSONA)
    }

    /// Keep at most `n` past exchanges. Zero sends only the persona and the
    /// current message.
    pub fn with_max_exchanges(mut self, n: usize) -> Self {
        self.max_exchanges = n;
        self
    }

    /// Past user and assistant turns, oldest first.
    pub fn history(&self) -> &[ChatMessage] {
        &self.turns
    }

    /// The full request for `input`: persona, history, then `input`.
    pub fn messages_for(&self, input: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() + 2);
        messages.push(self.persona.clone());
        messages.extend(self.turns.iter().cloned());
        messages.push(ChatMessage::user(input));
        messages
    }

    /// Stream the reply to `input`. History is untouched until `commit`.
    pub fn begin(&self, input: &str) -> BoxedStream {
        self.llm.stream_messages(&self.messages_for(input))
    }

    /// Record a finished exchange.
    pub fn commit(&mut self, input: &str, reply: &str) {
        self.turns.push(ChatMessage::user(input));
        self.turns.push(ChatMessage::assistant(reply));
        let excess = self.turns.len().saturating_sub(self.max_exchanges * 2);
        if excess > 0 {
            self.turns.drain(..excess);
            debug!("Dropped {} old turns", excess);
        }
    }

    /// Send `input` and record the exchange. A failed reply records nothing.
    pub async fn send(&mut self, input: &str) -> Result<String> {
        let reply = collect_text(self.begin(input)).await?;
        self.commit(input, &reply);
        Ok(reply)
    }
}

const EXPLAINER_TURNS: [(&str, &str); 4] = [
    (
        "system",
        "You are an {expert} in {domain}, please break down any question the user is going to ask you \
         in a clear and concise manner with a real world analogy",
    ),
    ("user", "Please {expert} help me with my question"),
    ("ai", "Sure, {name}, I can do just that"),
    ("user", "{user_input}"),
];

/// Who the explainer plays and whom it addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpertProfile {
    pub expert: String,
    pub domain: String,
    pub name: String,
}

impl Default for ExpertProfile {
    fn default() -> Self {
        Self {
            expert: "Gen AI Engineer".into(),
            domain: "Artificial Intelligence".into(),
            name: "friend".into(),
        }
    }
}

/// Explains one question in the voice of an expert, with an analogy.
pub struct Explainer {
    llm: Arc<dyn LanguageModel>,
    template: ChatPromptTemplate,
    profile: ExpertProfile,
}

impl Explainer {
    pub fn new(llm: Arc<dyn LanguageModel>, profile: ExpertProfile) -> Result<Self> {
        Ok(Self {
            llm,
            template: ChatPromptTemplate::from_messages(&EXPLAINER_TURNS)?,
            profile,
        })
    }

    pub fn messages(&self, question: &str) -> Result<Vec<ChatMessage>> {
        self.template.format_messages(&HashMap::from([
            ("expert", self.profile.expert.as_str()),
            ("domain", self.profile.domain.as_str()),
            ("name", self.profile.name.as_str()),
            ("user_input", question),
        ]))
    }

    pub fn stream(&self, question: &str) -> Result<BoxedStream> {
        Ok(self.llm.stream_messages(&self.messages(question)?))
    }

    pub async fn explain(&self, question: &str) -> Result<String> {
        self.llm.invoke_messages(&self.messages(question)?).await
    }
}

const REFLECTION_PROMPT: &str = "Help me reflect on my day. Today {events}. I felt {mood}. \
Give me a reflection and what I need to improve tomorrow.";

const ENTRY_RULE: &str = "__________________________________________________";

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub written_at: DateTime<Local>,
    pub events: String,
    pub mood: String,
    pub reflection: String,
}

/// Reflections on the day, appended to a plain-text journal.
pub struct Journal {
    llm: Arc<dyn LanguageModel>,
    path: PathBuf,
    template: PromptTemplate,
}

impl Journal {
    pub fn new(llm: Arc<dyn LanguageModel>, path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            llm,
            path: path.into(),
            template: PromptTemplate::new(REFLECTION_PROMPT)?,
        })
    }

    fn prompt(&self, events: &str, mood: &str) -> Result<String> {
        self.template
            .format(&HashMap::from([("events", events), ("mood", mood)]))
    }

    /// Stream a reflection without writing anything.
    pub fn reflect(&self, events: &str, mood: &str) -> Result<BoxedStream> {
        Ok(self.llm.stream(&self.prompt(events, mood)?))
    }

    /// Append `entry`, creating the journal if needed.
    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry.written_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(file, "Today I felt {} because {}", entry.mood, entry.events)?;
        writeln!(file, "AI Reflection:")?;
        writeln!(file, "{}", entry.reflection.trim_end())?;
        writeln!(file, "{}", ENTRY_RULE)?;
        info!("Journal entry appended to {}", self.path.display());
        Ok(())
    }

    /// Timestamp a finished reflection and append it.
    pub fn record(&self, events: &str, mood: &str, reflection: String) -> Result<JournalEntry> {
        let entry = JournalEntry {
            written_at: Local::now(),
            events: events.to_string(),
            mood: mood.to_string(),
            reflection,
        };
        self.append(&entry)?;
        Ok(entry)
    }

    /// Reflect on the day and record it. A failed reflection writes nothing.
    pub async fn write_entry(&self, events: &str, mood: &str) -> Result<JournalEntry> {
        let reflection = self.llm.invoke(&self.prompt(events, mood)?).await?;
        self.record(events, mood, reflection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use lectern_chat::StreamChunk;
    use lectern_core::Error;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Replies "reply N" and keeps every request it saw.
    #[derive(Default)]
    struct RecordingModel {
        requests: Mutex<Vec<Vec<ChatMessage>>>,
        fail: bool,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        fn stream(&self, prompt: &str) -> BoxedStream {
            self.stream_messages(&[ChatMessage::user(prompt)])
        }

        fn stream_messages(&self, messages: &[ChatMessage]) -> BoxedStream {
            let mut requests = self.requests.lock().unwrap();
            requests.push(messages.to_vec());
            let chunks = if self.fail {
                vec![StreamChunk::Error("connection reset".into())]
            } else {
                vec![
                    StreamChunk::Token(format!("reply {}", requests.len())),
                    StreamChunk::Done { tokens_used: 1 },
                ]
            };
            Box::pin(stream::iter(chunks))
        }

        fn model_name(&self) -> String {
            "recording".into()
        }
    }

    fn roles(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|m| m.role.as_str()).collect()
    }

    #[tokio::test]
    async fn test_tutor_sends_persona_and_history() {
        let model = Arc::new(RecordingModel::default());
        let mut tutor = Conversation::tutor(model.clone());

        assert_eq!(tutor.send("What is photosynthesis?").await.unwrap(), "reply 1");
        assert_eq!(tutor.send("Simpler please").await.unwrap(), "reply 2");

        let requests = model.requests.lock().unwrap();
        assert_eq!(roles(&requests[0]), vec!["system", "user"]);
        assert_eq!(requests[0][0].content, TUTOR_PERSONA);
        assert_eq!(
            roles(&requests[1]),
            vec!["system", "user", "assistant", "user"]
        );
        assert_eq!(requests[1][2].content, "reply 1");
        assert_eq!(requests[1][3].content, "Simpler please");
        assert_eq!(tutor.history().len(), 4);
    }

    #[tokio::test]
    async fn test_old_exchanges_are_dropped_first() {
        let model = Arc::new(RecordingModel::default());
        let mut tutor = Conversation::new(model, "Be brief.").with_max_exchanges(2);
        for q in ["one", "two", "three"] {
            tutor.send(q).await.unwrap();
        }

        let history = tutor.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0], ChatMessage::user("two"));
        assert_eq!(history[3], ChatMessage::assistant("reply 3"));

        let request = tutor.messages_for("four");
        assert_eq!(request[0], ChatMessage::system("Be brief."));
        assert_eq!(request.len(), 6);
    }

    #[tokio::test]
    async fn test_failed_reply_leaves_history_unchanged() {
        let model = Arc::new(RecordingModel {
            fail: true,
            ..Default::default()
        });
        let mut tutor = Conversation::tutor(model);

        let err = tutor.send("Hello").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(tutor.history().is_empty());
    }

    #[tokio::test]
    async fn test_explainer_builds_expert_conversation() {
        let model = Arc::new(RecordingModel::default());
        let explainer = Explainer::new(
            model.clone(),
            ExpertProfile {
                expert: "economist".into(),
                domain: "public finance".into(),
                name: "Ngozi".into(),
            },
        )
        .unwrap();

        assert_eq!(explainer.explain("What is inflation?").await.unwrap(), "reply 1");

        let requests = model.requests.lock().unwrap();
        let sent = &requests[0];
        assert_eq!(roles(sent), vec!["system", "user", "assistant", "user"]);
        assert!(sent[0].content.starts_with("You are an economist in public finance"));
        assert_eq!(sent[2].content, "Sure, Ngozi, I can do just that");
        assert_eq!(sent[3].content, "What is inflation?");
    }

    #[tokio::test]
    async fn test_journal_appends_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes/journal.txt");
        let model = Arc::new(RecordingModel::default());
        let journal = Journal::new(model.clone(), &path).unwrap();

        let first = journal.write_entry("I passed my exam", "happy").await.unwrap();
        journal.write_entry("it rained all day", "tired").await.unwrap();
        assert_eq!(first.reflection, "reply 1");

        let prompt = &model.requests.lock().unwrap()[0][0].content;
        assert!(prompt.contains("Today I passed my exam. I felt happy."));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("Today I felt happy because I passed my exam\nAI Reflection:\nreply 1\n"));
        assert!(text.contains("Today I felt tired because it rained all day"));
        assert_eq!(text.matches(ENTRY_RULE).count(), 2);
    }

    #[tokio::test]
    async fn test_failed_reflection_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal.txt");
        let model = Arc::new(RecordingModel {
            fail: true,
            ..Default::default()
        });
        let journal = Journal::new(model, &path).unwrap();

        assert!(journal.write_entry("work", "fine").await.is_err());
        assert!(!path.exists());
    }
}
