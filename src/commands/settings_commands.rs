use crate::config::HighlightSettings;
use crate::error::AppError;
use crate::state::AppState;

pub fn get_settings(state: &AppState) -> HighlightSettings {
    state.settings.clone()
}

/// Applies the given overrides and persists the result.
pub fn update_settings(
    state: &mut AppState,
    exclude_rules: Option<String>,
    paragraph_cache_capacity: Option<usize>,
    extensions: Option<Vec<String>>,
) -> Result<HighlightSettings, AppError> {
    let mut settings = state.settings.clone();

    if let Some(rules) = exclude_rules {
        settings.exclude_rules = rules.replace("\\n", "\n");
    }
    if let Some(capacity) = paragraph_cache_capacity {
        if capacity == 0 {
            return Err(AppError::General(
                "paragraph cache capacity must be at least 1".to_string(),
            ));
        }
        settings.paragraph_cache_capacity = capacity;
    }
    if let Some(extensions) = extensions.filter(|e| !e.is_empty()) {
        settings.extensions = extensions;
    }

    state.save_settings(settings.clone())?;
    Ok(settings)
}
