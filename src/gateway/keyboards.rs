//! Inline keyboards.

use crate::i18n;
use goalbuddy_core::message::{InlineButton, InlineKeyboard};
use goalbuddy_core::state::ProgressChoice;

/// Day-2 progress keyboard: one button per choice, one per row.
pub fn progress_keyboard(lang: &str) -> InlineKeyboard {
    InlineKeyboard {
        rows: ProgressChoice::ALL
            .iter()
            .map(|choice| {
                vec![InlineButton {
                    text: i18n::progress_button(lang, *choice).to_string(),
                    callback_data: choice.callback_data().to_string(),
                }]
            })
            .collect(),
    }
}
