use std::sync::Arc;

use axum::extract::FromRef;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::GenerationConfig,
    error::{AppError, AppResult},
    llm::ModelClient,
    scripts::{
        normalize::{renumber, Normalizer},
        prompt::{build_prompt, build_supplement_prompt},
        repo::ScriptRepo,
        repo_types::{NewScriptRequest, ScriptInputs, ScriptRequest},
    },
    state::AppState,
};

/// Drives one generation: prompt, model call, normalization, an optional
/// top-up call, truncation to the target count, and persistence.
///
/// At most two model calls are made per request. Nothing is stored unless at
/// least one usable script came back.
#[derive(Clone)]
pub struct ScriptGenerator {
    model: Arc<dyn ModelClient>,
    store: Arc<dyn ScriptRepo>,
    profile: GenerationConfig,
    normalizer: Normalizer,
}

impl FromRef<AppState> for ScriptGenerator {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.model.clone(),
            state.scripts.clone(),
            state.config.generation.clone(),
        )
    }
}

impl ScriptGenerator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        store: Arc<dyn ScriptRepo>,
        profile: GenerationConfig,
    ) -> Self {
        let normalizer = Normalizer::from_profile(&profile);
        Self {
            model,
            store,
            profile,
            normalizer,
        }
    }

    #[instrument(skip(self, inputs), fields(provider = self.model.provider_name(), product = %inputs.product_name))]
    pub async fn generate(&self, user_id: Uuid, inputs: ScriptInputs) -> AppResult<ScriptRequest> {
        inputs.validate().map_err(AppError::Validation)?;
        let target = self.profile.target_count;

        let prompt = build_prompt(&inputs, &self.profile.sections, target);
        let raw = self
            .model
            .complete(&prompt, self.profile.max_tokens, self.profile.temperature)
            .await?;
        let mut scripts = self.normalizer.normalize(&raw);
        info!(received = scripts.len(), target, "first generation call done");

        if scripts.len() < target {
            let remaining = target - scripts.len();
            let prompt =
                build_supplement_prompt(&inputs, &self.profile.sections, scripts.len(), remaining);
            let raw = self
                .model
                .complete(&prompt, self.profile.max_tokens, self.profile.temperature)
                .await?;
            let extra = self.normalizer.normalize_from(&raw, scripts.len() + 1);
            info!(received = extra.len(), remaining, "supplemental generation call done");
            scripts.extend(extra);
        }

        scripts.truncate(target);
        let scripts = renumber(scripts);
        if scripts.is_empty() {
            warn!("model produced no usable scripts");
            return Err(AppError::UpstreamGeneration(
                "the model returned no usable scripts".into(),
            ));
        }
        if scripts.len() < target {
            warn!(count = scripts.len(), target, "returning fewer scripts than requested");
        }

        let record = self
            .store
            .create(NewScriptRequest {
                user_id,
                inputs,
                scripts,
            })
            .await?;
        info!(request_id = %record.id, count = record.scripts.len(), "scripts stored");
        Ok(record)
    }

    /// The caller's stored requests, newest first.
    #[instrument(skip(self))]
    pub async fn history(&self, user_id: Uuid) -> AppResult<Vec<ScriptRequest>> {
        Ok(self.store.list_by_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        llm::{ModelError, RawContent},
        testing::{numbered_scripts, MemoryScriptRepo, ScriptedModel},
    };
    use serde_json::json;

    fn profile() -> GenerationConfig {
        GenerationConfig {
            require_sections: false,
            ..GenerationConfig::default()
        }
    }

    fn inputs() -> ScriptInputs {
        ScriptInputs {
            product_name: "Brew Box".into(),
            target_audience: "remote workers".into(),
            tone: "upbeat".into(),
            ad_style: "testimonial".into(),
            call_to_action: None,
        }
    }

    fn generator(
        model: ScriptedModel,
        store: MemoryScriptRepo,
    ) -> (Arc<ScriptedModel>, Arc<MemoryScriptRepo>, ScriptGenerator) {
        let model = Arc::new(model);
        let store = Arc::new(store);
        let gen = ScriptGenerator::new(model.clone(), store.clone(), profile());
        (model, store, gen)
    }

    #[tokio::test]
    async fn short_first_call_is_topped_up_in_order() {
        let (model, store, gen) = generator(
            ScriptedModel::new()
                .then_text(numbered_scripts("first", 1..=5))
                .then_text(numbered_scripts("second", 6..=8)),
            MemoryScriptRepo::default(),
        );
        let user = Uuid::new_v4();
        let scripts = gen.generate(user, inputs()).await.expect("generate").scripts;

        assert_eq!(scripts.len(), 8);
        assert_eq!(scripts[0], "Script 1: first body 1");
        assert_eq!(scripts[4], "Script 5: first body 5");
        assert_eq!(scripts[5], "Script 6: second body 6");
        assert_eq!(scripts[7], "Script 8: second body 8");

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].prompt.contains("Generate 8 different"));
        assert!(calls[1].prompt.contains("generate 3 more"));
        assert!(calls.iter().all(|c| c.max_tokens == 4000));

        let history = store.list_by_user(user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].scripts, scripts);
    }

    #[tokio::test]
    async fn untitled_supplement_scripts_continue_numbering() {
        let blocks = vec![json!({"type": "text", "text": "Script 1: only one"})];
        let (_, _, gen) = generator(
            ScriptedModel::new()
                .then(Ok(RawContent::Blocks(blocks)))
                .then_text("1. second idea\n2. third idea"),
            MemoryScriptRepo::default(),
        );
        let scripts = gen.generate(Uuid::new_v4(), inputs()).await.unwrap().scripts;
        assert_eq!(
            scripts,
            vec![
                "Script 1: only one",
                "Script 2:\nsecond idea",
                "Script 3:\nthird idea",
            ]
        );
    }

    #[tokio::test]
    async fn joined_titles_are_sequential_when_the_top_up_restarts() {
        let (_, _, gen) = generator(
            ScriptedModel::new()
                .then_text("Script 1: a\nScript 2: b\nScript 4: d\nScript 5: e\nScript 6: f")
                .then_text(numbered_scripts("late", 1..=3)),
            MemoryScriptRepo::default(),
        );
        let scripts = gen.generate(Uuid::new_v4(), inputs()).await.unwrap().scripts;
        let titles: Vec<&str> = scripts
            .iter()
            .map(|s| s.split(':').next().unwrap())
            .collect();
        assert_eq!(
            titles,
            (1..=8).map(|n| format!("Script {n}")).collect::<Vec<_>>()
        );
        assert_eq!(scripts[2], "Script 3: d");
        assert_eq!(scripts[5], "Script 6: late body 1");
    }

    #[tokio::test]
    async fn long_first_response_is_truncated_without_second_call() {
        let (model, _, gen) = generator(
            ScriptedModel::new().then_text(numbered_scripts("x", 1..=10)),
            MemoryScriptRepo::default(),
        );
        let scripts = gen.generate(Uuid::new_v4(), inputs()).await.unwrap().scripts;
        assert_eq!(scripts.len(), 8);
        assert_eq!(scripts[7], "Script 8: x body 8");
        assert_eq!(model.calls().len(), 1);
    }

    #[tokio::test]
    async fn still_short_after_top_up_is_accepted() {
        let (model, store, gen) = generator(
            ScriptedModel::new()
                .then_text(numbered_scripts("a", 1..=2))
                .then_text(""),
            MemoryScriptRepo::default(),
        );
        let scripts = gen.generate(Uuid::new_v4(), inputs()).await.unwrap().scripts;
        assert_eq!(scripts.len(), 2);
        assert_eq!(model.calls().len(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn nothing_usable_is_an_upstream_error() {
        let (_, store, gen) = generator(
            ScriptedModel::new().then_text("").then_text("   "),
            MemoryScriptRepo::default(),
        );
        let err = gen.generate(Uuid::new_v4(), inputs()).await.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_GENERATION_ERROR");
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn model_failure_persists_nothing() {
        let failing = || {
            Err(ModelError::Api {
                status: 503,
                message: "overloaded".into(),
            })
        };

        let (_, store, gen) = generator(
            ScriptedModel::new().then(failing()),
            MemoryScriptRepo::default(),
        );
        let err = gen.generate(Uuid::new_v4(), inputs()).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamGeneration(_)));
        assert_eq!(store.len(), 0);

        let (_, store, gen) = generator(
            ScriptedModel::new()
                .then_text(numbered_scripts("a", 1..=3))
                .then(failing()),
            MemoryScriptRepo::default(),
        );
        let err = gen.generate(Uuid::new_v4(), inputs()).await.unwrap_err();
        assert!(matches!(err, AppError::UpstreamGeneration(_)));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn store_failure_is_a_persistence_error() {
        let (_, _, gen) = generator(
            ScriptedModel::new().then_text(numbered_scripts("a", 1..=8)),
            MemoryScriptRepo::failing(),
        );
        let err = gen.generate(Uuid::new_v4(), inputs()).await.unwrap_err();
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
    }

    #[tokio::test]
    async fn invalid_inputs_never_reach_the_model() {
        let (model, _, gen) = generator(ScriptedModel::new(), MemoryScriptRepo::default());
        let mut bad = inputs();
        bad.tone = "  ".into();
        let err = gen.generate(Uuid::new_v4(), bad).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn history_is_per_user_newest_first_and_stable() {
        let (_, _, gen) = generator(
            ScriptedModel::new()
                .then_text(numbered_scripts("first", 1..=8))
                .then_text(numbered_scripts("other", 1..=8))
                .then_text(numbered_scripts("second", 1..=8)),
            MemoryScriptRepo::default(),
        );
        let me = Uuid::new_v4();
        let someone = Uuid::new_v4();
        gen.generate(me, inputs()).await.unwrap();
        gen.generate(someone, inputs()).await.unwrap();
        gen.generate(me, inputs()).await.unwrap();

        let first = gen.history(me).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].scripts[0], "Script 1: second body 1");
        assert_eq!(first[1].scripts[0], "Script 1: first body 1");
        assert!(first.iter().all(|r| r.user_id == me));
        assert_eq!(gen.history(me).await.unwrap(), first);
        assert!(gen.history(Uuid::new_v4()).await.unwrap().is_empty());
    }
}
