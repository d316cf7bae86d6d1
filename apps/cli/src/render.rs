use std::fmt::Write as _;

use console::style;
use vidquiz_core::{Question, SegmentPlan, Trigger};

/// `mm:ss`, or `h:mm:ss` past the hour.
pub fn format_position(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

pub fn format_plan(plan: &SegmentPlan, duration: f64) -> String {
    let mut out = String::new();
    for entry in plan.iter() {
        let when = match entry.trigger {
            Trigger::At(at) if at > duration => {
                format!("{} {}", format_position(at), style("(never reached)").dim())
            }
            Trigger::At(at) => format_position(at),
            Trigger::EndOfPlayback => "end of video".to_string(),
        };
        let _ = writeln!(
            out,
            "  {} {}",
            style(format!("Quiz {}", entry.segment + 1)).bold(),
            when
        );
    }
    out
}

pub fn format_question(number: usize, total: usize, question: &Question) -> String {
    let mut out = format!(
        "\n{} {}\n",
        style(format!("[{number}/{total}]")).dim(),
        style(&question.question).bold()
    );
    for option in &question.options {
        let _ = writeln!(out, "    {option}");
    }
    out
}

pub fn format_verdict(question: &Question, chosen: Option<&str>) -> String {
    let verdict = match chosen {
        Some(option) if question.is_correct(option) => style("✓ Correct").green().bold(),
        Some(_) => style("✗ Incorrect").red().bold(),
        None => style("- Skipped").yellow().bold(),
    };

    let mut out = format!(
        "  {verdict} {}",
        style(format!("(answer: {})", question.correct_answer)).dim()
    );
    if !question.explanation.is_empty() {
        let _ = write!(out, "\n  {}", style(&question.explanation).dim());
    }
    out
}

pub fn format_stars(amount: u32, total: Option<u64>) -> String {
    let earned = style(format!("+{amount} ★")).yellow().bold();
    match total {
        Some(total) => format!("{earned} {}", style(format!("(total {total})")).dim()),
        None => format!("{earned} {}", style("(not saved)").red()),
    }
}

/// Match typed input against the options: a label (`b`), a 1-based index, or
/// the full option text.
pub fn pick_option<'a>(question: &'a Question, input: &str) -> Option<&'a str> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(index) = input.parse::<usize>() {
        if let Some(option) = index.checked_sub(1).and_then(|i| question.options.get(i)) {
            return Some(option.as_str());
        }
    }

    question
        .options
        .iter()
        .find(|option| {
            Question::option_label(option).eq_ignore_ascii_case(input)
                || option.trim().eq_ignore_ascii_case(input)
        })
        .map(String::as_str)
}
