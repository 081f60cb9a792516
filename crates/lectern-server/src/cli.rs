//! Command-line subcommands.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing::warn;

use lectern_chat::{BoxedStream, HttpLanguageModel, LLMConfig, LLMProvider, LanguageModel, StreamChunk};
use lectern_core::{Error, LecternConfig};
use lectern_ingest::WeatherFeed;
use lectern_resolve::QueryStatus;
use lectern_runtime::{
    Assistant, BuildReport, Conversation, ExpertProfile, Explainer, Journal, PreparedAnswer,
    RecipeWriter, WeatherAdvisor,
};

use crate::state::AppState;

/// Words that end an interactive session.
pub const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];

pub fn is_exit(line: &str) -> bool {
    let line = line.trim().to_lowercase();
    EXIT_WORDS.contains(&line.as_str())
}

pub fn print_help() {
    println!("Lectern: grounded question answering over a document corpus");
    println!();
    println!("Usage: lectern [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Build the corpus and start the HTTP server");
    println!("  build                    Load sources, build the index, print a report");
    println!("  ask <question>           Answer one question");
    println!("  chat                     Interactive session (exit, quit or bye to leave)");
    println!("  news <query>             Analyse the latest news for a query");
    println!("  weather <city>           Interactive weather advice for a city");
    println!("  recipe <food>            Suggest a recipe for the given food");
    println!("  tutor                    Multi-turn chat with a personal tutor (no corpus)");
    println!("  explain <question>       Expert breakdown of a question with an analogy");
    println!("  journal                  Reflect on your day and append it to the journal");
    println!("  provider <name>          Set the preferred LLM provider (gemini, openai, anthropic, groq, auto)");
    println!("  help                     Show this help message");
}

pub fn print_report(report: &BuildReport) {
    println!(
        "Indexed {} documents as {} chunks in {}ms",
        report.documents, report.chunks, report.duration_ms
    );
    if report.duplicates_skipped > 0 {
        println!("Skipped {} duplicate documents", report.duplicates_skipped);
    }
    for w in &report.warnings {
        println!("  ! {} {}: {}", w.source.kind, w.source.locator, w.error);
    }
}

/// Build the corpus and print the report.
async fn with_corpus(state: &AppState) -> anyhow::Result<()> {
    let report = state
        .assistant
        .build_corpus()
        .await
        .context("corpus build failed")?;
    print_report(&report);
    Ok(())
}

pub async fn build(state: &AppState) -> anyhow::Result<()> {
    with_corpus(state).await
}

pub async fn ask(state: &AppState, question: &str) -> anyhow::Result<()> {
    with_corpus(state).await?;
    let result = state.assistant.ask(question).await;
    println!();
    println!("{}", result.answer_text);
    for (i, chunk) in result.retrieved_chunks.iter().enumerate() {
        println!("  [Source {}] {} #{}", i + 1, chunk.source_ref, chunk.chunk_index);
    }
    Ok(())
}

/// Print tokens as they arrive and return the full text.
async fn echo_stream(mut stream: BoxedStream) -> anyhow::Result<lectern_core::Result<String>> {
    let mut text = String::new();
    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(token) => {
                print!("{}", token);
                stdout.flush()?;
                text.push_str(&token);
            }
            StreamChunk::Done { .. } => break,
            StreamChunk::Error(e) => {
                println!();
                return Ok(Err(Error::Transport(e)));
            }
        }
    }
    println!();
    Ok(Ok(text))
}

/// Stream one answer to stdout.
async fn stream_answer(assistant: &Assistant, question: &str) -> anyhow::Result<()> {
    match assistant.prepare_stream(question).await {
        PreparedAnswer::Finished(result) => println!("{}", result.answer_text),
        PreparedAnswer::Streaming { chunks, stream } => {
            let outcome = echo_stream(stream).await?;
            let result = assistant.finish_stream(question, chunks, outcome);
            if result.status == QueryStatus::Error {
                eprintln!("{}", result.answer_text);
            }
        }
    }
    Ok(())
}

/// Read non-empty lines from stdin until EOF or an exit word.
async fn prompt_loop<F, Fut>(prompt: &str, mut handle: F) -> anyhow::Result<()>
where
    F: FnMut(String) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<()>>,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if is_exit(&line) {
            println!("Goodbye!");
            break;
        }
        handle(line).await?;
    }
    Ok(())
}

pub async fn chat(state: &AppState) -> anyhow::Result<()> {
    with_corpus(state).await?;
    println!("Ask about {} (exit, quit or bye to leave).", state.config.assistant.domain_name);
    prompt_loop("\nYou: ", |question| async move {
        print!("Assistant: ");
        stream_answer(&state.assistant, &question).await
    })
    .await
}

pub async fn news(state: &AppState, query: &str) -> anyhow::Result<()> {
    let analyst = state
        .news
        .as_ref()
        .context("news analysis needs NEWS_API_KEY")?;
    match analyst.analyze(query).await {
        Ok(report) => {
            let a = &report.analysis;
            println!("Title:        {}", a.title);
            println!("Article:      {}", a.article);
            println!("Summary:      {}", a.ai_summary);
            println!("Sentiment:    {}", a.sentiment_analysis);
            println!("Key topics:   {}", a.key_topics);
            println!("Credibility:  {}", a.credibility_assessment);
            println!("Pidgin:       {}", a.pidgin_version);
            if let Some(id) = report.record_id {
                println!("Stored as {}", id);
            }
            Ok(())
        }
        Err(e) => {
            if let Some(raw) = e.raw_output() {
                eprintln!("Parsing failed, raw response:\n{}", raw);
            }
            Err(e.into())
        }
    }
}

pub async fn weather(state: &AppState, city: &str) -> anyhow::Result<()> {
    let advisor = WeatherAdvisor::new(WeatherFeed::from_env()?, state.llm.clone())?;
    let conditions = advisor.conditions(city).await?;
    println!("Weather for {} loaded. Ask away (exit, quit or bye to leave).", city);
    let (advisor, conditions) = (&advisor, conditions.as_str());
    prompt_loop("\nYou: ", |question| async move {
        match advisor.advise_with(conditions, &question).await {
            Ok(advice) => println!("{}", advice),
            Err(e) => warn!("Weather advice failed: {}", e),
        }
        Ok(())
    })
    .await
}

pub async fn recipe(state: &AppState, food: &str) -> anyhow::Result<()> {
    let writer = RecipeWriter::new(state.llm.clone())?;
    match writer.recipe(food).await {
        Ok(recipe) => {
            println!("{} (serves {})", recipe.name, recipe.servings);
            println!("Prep {} min, cook {} min", recipe.prep_time, recipe.cook_time);
            println!();
            for item in &recipe.ingredients {
                println!("  - {}", item);
            }
            println!();
            println!("{}", recipe.instructions);
            Ok(())
        }
        Err(e) => {
            if let Some(raw) = e.raw_output() {
                eprintln!("Parsing failed, raw response:\n{}", raw);
            }
            Err(e.into())
        }
    }
}

pub async fn tutor(state: &AppState) -> anyhow::Result<()> {
    println!("PERSONAL TUTOR ASSISTANT");
    println!("{}", "_".repeat(70));
    let conversation = tokio::sync::Mutex::new(Conversation::tutor(state.llm.clone()));
    let conversation = &conversation;
    prompt_loop("\nYou: ", |input| async move {
        let mut conversation = conversation.lock().await;
        print!("Tutor: ");
        match echo_stream(conversation.begin(&input)).await? {
            Ok(reply) => conversation.commit(&input, &reply),
            Err(e) => warn!("Tutor reply failed: {}", e),
        }
        Ok(())
    })
    .await
}

pub async fn explain(state: &AppState, question: &str) -> anyhow::Result<()> {
    let explainer = Explainer::new(state.llm.clone(), ExpertProfile::default())?;
    println!("Loading, please wait...");
    echo_stream(explainer.stream(question)?).await??;
    Ok(())
}

/// Read one non-empty answer to `question` from stdin.
async fn ask_line<R>(lines: &mut tokio::io::Lines<R>, question: &str) -> anyhow::Result<String>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    loop {
        println!("{}", question);
        let line = lines.next_line().await?.context("input closed")?;
        if !line.trim().is_empty() {
            return Ok(line.trim().to_string());
        }
    }
}

pub async fn journal(state: &AppState) -> anyhow::Result<()> {
    let journal = Journal::new(state.llm.clone(), &state.config.data_paths.journal_file)?;
    println!("Welcome to your daily journal!");
    println!("{}", "_".repeat(50));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let events = ask_line(&mut lines, "What happened today?").await?;
    let mood = ask_line(&mut lines, "How was your mood today?").await?;

    println!("REFLECTION");
    println!("{}", "_".repeat(50));
    let reflection = echo_stream(journal.reflect(&events, &mood)?).await??;
    journal.record(&events, &mood, reflection)?;
    println!("Saved to {}", state.config.data_paths.journal_file.display());
    Ok(())
}

/// Persist the preferred provider to `llm-config.json`.
pub fn set_provider(config: &LecternConfig, name: &str) -> anyhow::Result<()> {
    let name = name.trim().to_lowercase();
    if name != "auto" && LLMProvider::parse(&name).is_none() {
        anyhow::bail!("unknown provider '{}'", name);
    }
    let mut llm_config = LLMConfig::load(&config.data_paths.llm_config_file);
    llm_config.preferred_provider = name;
    llm_config.save()?;

    match HttpLanguageModel::from_config(&llm_config) {
        Ok(model) => println!("Using {}", model.model_name()),
        Err(e) => println!("Saved, but not usable yet: {}", e),
    }
    Ok(())
}

/// Shared state for commands that talk to the model.
pub fn init_state(config: LecternConfig) -> anyhow::Result<Arc<AppState>> {
    Ok(Arc::new(
        AppState::init(config).context("failed to initialise collaborators")?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words() {
        assert!(is_exit("exit"));
        assert!(is_exit("  Quit "));
        assert!(is_exit("BYE"));
        assert!(!is_exit("what are the fees? exit"));
        assert!(!is_exit(""));
    }

    #[test]
    fn test_set_provider_rejects_unknown_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LecternConfig::with_data_dir(dir.path()).unwrap();
        assert!(set_provider(&config, "ollama").is_err());
        assert!(!config.data_paths.llm_config_file.exists());
    }

    #[test]
    fn test_set_provider_persists_choice() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LecternConfig::with_data_dir(dir.path()).unwrap();
        set_provider(&config, "Groq").unwrap();

        let saved = LLMConfig::load(&config.data_paths.llm_config_file);
        assert_eq!(saved.preferred_provider, "groq");
    }
}
