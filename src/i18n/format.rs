//! Format helpers for strings with interpolation.

use goalbuddy_core::state::ProgressChoice;

/// Confirmation after a goal is saved.
pub fn goal_confirmation(lang: &str, goal: &str) -> String {
    match lang {
        "Russian" => format!(
            "✅ Цель сохранена:\n\n_{goal}_\n\nЗавтра я спрошу, как продвигается дело."
        ),
        _ => format!("✅ Goal saved:\n\n_{goal}_\n\nI'll check in with you tomorrow."),
    }
}

/// Prompt for the final self-assessment.
pub fn assessment_request(lang: &str, goal: &str) -> String {
    match lang {
        "Russian" => format!(
            "📈 Твоя цель:\n\n_{goal}_\n\nНа сколько процентов ты её выполнил(а)? \
             Отправь число от 0 до 100."
        ),
        _ => format!(
            "📈 Your goal:\n\n_{goal}_\n\nHow much of it did you achieve? \
             Send a number from 0 to 100."
        ),
    }
}

/// Thanks after the self-assessment is saved.
pub fn assessment_thanks(lang: &str, score: u8) -> String {
    match lang {
        "Russian" => format!("🎉 Спасибо! Записал твою оценку: *{score}%*."),
        _ => format!("🎉 Thank you! Your self-assessment of *{score}%* is saved."),
    }
}

/// The day-2 reminder.
pub fn reminder(lang: &str, username: &str, goal: &str) -> String {
    match lang {
        "Russian" => format!(
            "Привет, {username}! 👋\n\nВчера ты поставил(а) цель:\n\n_{goal}_\n\n\
             Как продвигается?"
        ),
        _ => format!("Hi {username}! 👋\n\nYesterday you set this goal:\n\n_{goal}_\n\nHow is it going?"),
    }
}

/// Reply to a progress button press.
pub fn progress_response(lang: &str, choice: ProgressChoice) -> &'static str {
    let ru = lang == "Russian";
    match (choice, ru) {
        (ProgressChoice::OnTrack, true) => "🔥 Отлично! Так держать, ты на верном пути.",
        (ProgressChoice::OnTrack, false) => "🔥 Great! Keep it up, you're on the right track.",
        (ProgressChoice::Difficulties, true) => {
            "💪 Трудности это нормально. Попробуй разбить цель на маленькие шаги \
             и сделать сегодня хотя бы один."
        }
        (ProgressChoice::Difficulties, false) => {
            "💪 Difficulties are normal. Try breaking the goal into small steps \
             and do at least one of them today."
        }
        (ProgressChoice::NotStarted, true) => {
            "🌱 Ничего страшного! Начни с самого простого шага прямо сейчас."
        }
        (ProgressChoice::NotStarted, false) => "🌱 No worries! Start with the simplest step right now.",
    }
}

/// Label of a progress button.
pub fn progress_button(lang: &str, choice: ProgressChoice) -> &'static str {
    let ru = lang == "Russian";
    match (choice, ru) {
        (ProgressChoice::OnTrack, true) => "✅ Всё идёт по плану",
        (ProgressChoice::OnTrack, false) => "✅ On track",
        (ProgressChoice::Difficulties, true) => "⚠️ Есть трудности",
        (ProgressChoice::Difficulties, false) => "⚠️ Having difficulties",
        (ProgressChoice::NotStarted, true) => "⏳ Ещё не начал(а)",
        (ProgressChoice::NotStarted, false) => "⏳ Not started yet",
    }
}
