use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize, Debug)]
pub struct StatusResponse {
    pub api_url: String,
    pub cut_method: &'static str,
    pub gpt_model_path: String,
    pub sovits_model_path: String,
    pub filter_brackets: bool,
    pub filter_emoji: bool,
    pub auto_convert: bool,
    pub auto_convert_busy: bool,
    pub commands: Vec<String>,
}

pub async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let settings = state.settings.snapshot();
    Json(StatusResponse {
        api_url: settings.api_url.clone(),
        cut_method: settings.cut_method.as_str(),
        gpt_model_path: settings.gpt_model_path.clone(),
        sovits_model_path: settings.sovits_model_path.clone(),
        filter_brackets: settings.filter_brackets,
        filter_emoji: settings.filter_emoji,
        auto_convert: settings.auto_convert,
        auto_convert_busy: state.auto_convert.guard().is_busy(),
        commands: state.host.commands().into_iter().map(|(name, _)| name).collect(),
    })
}
