//! Prompt → parse → persist flows over live context feeds.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lectern_chat::{parse_json, LanguageModel, PromptTemplate};
use lectern_core::Result;
use lectern_ingest::{NewsFeed, WeatherFeed};
use lectern_store::HistoryStore;

/// History collection for analysed news.
pub const NEWS_COLLECTION: &str = "news_articles";

const NEWS_PROMPT: &str = r#"You are a news master that receives news articles: {context},
generate a summary in 2 sentences max, and a pidgin version together
with the other information in the following JSON format:
{{
    "title": string,
    "article": string,
    "ai_summary": string,
    "sentiment_analysis": string,
    "key_topics": string,
    "credibility_assessment": string,
    "pidgin_version": string
}}
"#;

const WEATHER_PROMPT: &str = "You are a weather master that answer user questions based on: {context}, \
i want you to advice users on what to wear, what to do and how to prepare the day. \
Be flexible and always answer user queries and it should never go off topic.\n\n\
User: {question}";

const RECIPE_PROMPT: &str = r#"Based on the food provided {food}, provide a recipe, together with other information in the following JSON format:
{{
    "name": string,
    "ingredients": list[string],
    "instructions": string,
    "prep_time": int,
    "cook_time": int,
    "servings": int
}}
"#;

/// Structured analysis of the latest news for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsAnalysis {
    pub title: String,
    pub article: String,
    pub ai_summary: String,
    pub sentiment_analysis: String,
    pub key_topics: String,
    /// The model's own assessment text.
    #[serde(alias = "credibility_assesment")]
    pub credibility_assessment: String,
    pub pidgin_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsReport {
    pub analysis: NewsAnalysis,
    /// History id, when the analysis was persisted.
    pub record_id: Option<String>,
}

pub struct NewsAnalyst {
    feed: NewsFeed,
    llm: Arc<dyn LanguageModel>,
    history: Option<Arc<HistoryStore>>,
    template: PromptTemplate,
}

impl NewsAnalyst {
    pub fn new(
        feed: NewsFeed,
        llm: Arc<dyn LanguageModel>,
        history: Option<Arc<HistoryStore>>,
    ) -> Result<Self> {
        Ok(Self {
            feed,
            llm,
            history,
            template: PromptTemplate::new(NEWS_PROMPT)?,
        })
    }

    /// Fetch news for `query`, analyse it, and persist the analysis.
    ///
    /// Undecodable model output is `Error::Parse` with the raw text attached.
    /// A failed save is logged and leaves `record_id` empty.
    pub async fn analyze(&self, query: &str) -> Result<NewsReport> {
        let context = self.feed.latest(query).await?;
        let prompt = self
            .template
            .format(&HashMap::from([("context", context.to_string())]))?;

        let raw = self.llm.invoke(&prompt).await?;
        let analysis: NewsAnalysis = parse_json(&raw).map_err(|e| {
            warn!("News analysis for '{}' did not parse: {}", query, e);
            e
        })?;
        info!("Analysed news for '{}': {}", query, analysis.title);

        let record_id = self.history.as_ref().and_then(|history| {
            match history.append(NEWS_COLLECTION, &analysis) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Failed to store news analysis: {}", e);
                    None
                }
            }
        });

        Ok(NewsReport {
            analysis,
            record_id,
        })
    }
}

/// Day-planning advice from current weather.
pub struct WeatherAdvisor {
    feed: WeatherFeed,
    llm: Arc<dyn LanguageModel>,
    template: PromptTemplate,
}

impl WeatherAdvisor {
    pub fn new(feed: WeatherFeed, llm: Arc<dyn LanguageModel>) -> Result<Self> {
        Ok(Self {
            feed,
            llm,
            template: PromptTemplate::new(WEATHER_PROMPT)?,
        })
    }

    /// Current conditions for `city`, fetched once per conversation.
    pub async fn conditions(&self, city: &str) -> Result<String> {
        Ok(self.feed.current(city).await?.to_string())
    }

    /// Answer `question` against previously fetched `conditions`.
    pub async fn advise_with(&self, conditions: &str, question: &str) -> Result<String> {
        let prompt = self.template.format(&HashMap::from([
            ("context", conditions),
            ("question", question),
        ]))?;
        self.llm.invoke(&prompt).await
    }

    pub async fn advise(&self, city: &str, question: &str) -> Result<String> {
        let conditions = self.conditions(city).await?;
        debug!("Weather for {}: {} bytes of context", city, conditions.len());
        self.advise_with(&conditions, question).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: String,
    /// Minutes.
    pub prep_time: u32,
    /// Minutes.
    pub cook_time: u32,
    pub servings: u32,
}

pub struct RecipeWriter {
    llm: Arc<dyn LanguageModel>,
    template: PromptTemplate,
}

impl RecipeWriter {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Result<Self> {
        Ok(Self {
            llm,
            template: PromptTemplate::new(RECIPE_PROMPT)?,
        })
    }

    pub async fn recipe(&self, food: &str) -> Result<Recipe> {
        let prompt = self.template.format(&HashMap::from([("food", food)]))?;
        let raw = self.llm.invoke(&prompt).await?;
        parse_json(&raw)
    }
}
