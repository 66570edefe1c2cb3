//! Localized user-facing texts.
//!
//! Uses a simple `t(key, lang)` function for static strings and
//! format helpers for strings with interpolation.
//! Supported languages: English (fallback), Russian.

mod format;


pub use format::*;

/// Return a localized static string for `key` in the given `lang`.
/// Falls back to English for unsupported languages.
pub fn t(key: &str, lang: &str) -> &'static str {
    let ru = lang == "Russian";
    match key {
        "welcome" => {
            if ru {
                "👋 Привет! Это *GoalBuddy*.\n\n\
                 Давай поставим цель на ближайшие дни. Напиши её одним сообщением \
                 (от 10 до 500 символов). Завтра я спрошу, как идут дела, а в конце \
                 ты сможешь оценить результат командой /assess."
            } else {
                "👋 Hi! This is *GoalBuddy*.\n\n\
                 Let's set a goal for the next few days. Send it as one message \
                 (10 to 500 characters). Tomorrow I'll check in on how it's going, \
                 and at the end you can rate your result with /assess."
            }
        }
        "goal_too_short" => {
            if ru {
                "Цель слишком короткая. Опиши её подробнее (минимум 10 символов)."
            } else {
                "That goal is too short. Please describe it in a bit more detail (at least 10 characters)."
            }
        }
        "goal_too_long" => {
            if ru {
                "Цель слишком длинная. Сократи её до 500 символов."
            } else {
                "That goal is too long. Please keep it under 500 characters."
            }
        }
        "no_goal" => {
            if ru {
                "У тебя пока нет цели. Отправь /start, чтобы её поставить."
            } else {
                "You don't have a goal yet. Send /start to set one."
            }
        }
        "invalid_assessment" => {
            if ru {
                "Пожалуйста, отправь целое число от 0 до 100."
            } else {
                "Please send a whole number from 0 to 100."
            }
        }
        "generic_error" => {
            if ru {
                "Что-то пошло не так. Попробуй ещё раз чуть позже."
            } else {
                "Something went wrong. Please try again in a moment."
            }
        }
        _ => "???",
    }
}
