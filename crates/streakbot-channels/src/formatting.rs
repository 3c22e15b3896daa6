//! Text helpers shared by the channels.
//!
//! Telegram accepts a small HTML subset, so replies are escaped and
//! `` `inline code` `` spans become `<code>` tags. Long replies are split at
//! newline boundaries to fit each platform's message limit.

use streakbot_core::types::LogReport;

/// Escape the characters Telegram's HTML parser treats specially.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Convert plain reply text to Telegram HTML.
///
/// Text is escaped; paired backticks become `<code>` spans. An unpaired
/// backtick is kept as-is.
pub fn text_to_telegram_html(text: &str) -> String {
    let parts: Vec<&str> = text.split('`').collect();
    let mut out = String::with_capacity(text.len());

    for (i, part) in parts.iter().enumerate() {
        let is_code = i % 2 == 1;
        // An odd segment without a closing backtick after it is not code.
        if is_code && i + 1 < parts.len() {
            out.push_str("<code>");
            out.push_str(&escape_html(part));
            out.push_str("</code>");
        } else {
            if is_code {
                out.push('`');
            }
            out.push_str(&escape_html(part));
        }
    }

    out
}

/// Render a log report as Telegram HTML.
pub fn report_to_telegram_html(report: &LogReport) -> String {
    let mut out = format!(
        "<b>{}</b>\n<i>{}</i>\n",
        escape_html(&report.title()),
        escape_html(&report.summary())
    );

    for entry in &report.entries {
        out.push_str(&format!(
            "\n<b>{}</b>\n{}\n",
            escape_html(&entry.heading()),
            escape_html(&entry.message)
        ));
    }

    out.push_str(&format!(
        "\n<b>Days completed:</b> {}\n<b>Current Streak:</b> {}\n<i>{}</i>",
        report.total,
        report.streak,
        text_to_telegram_html(&report.footer())
    ));
    out
}

/// Split a message into chunks of at most `max_len` bytes.
///
/// Splits at the last newline inside the limit when there is one, otherwise
/// at the last character boundary before it.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len || max_len == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        if limit == 0 {
            // A single character wider than the limit.
            limit = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }

        let split_at = match remaining[..limit].rfind('\n') {
            Some(0) | None => limit,
            Some(i) => i,
        };

        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk.to_string());
        remaining = rest.strip_prefix('\n').unwrap_or(rest);
    }

    chunks
}

/// Strip Telegram HTML back to plain text: tags removed, entities decoded.
///
/// A `<` that never closes is kept, so text cut mid-tag loses nothing.
pub fn html_to_plain(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    out.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use streakbot_core::types::ReportEntry;

    fn report() -> LogReport {
        LogReport {
            display_name: "ferris".into(),
            avatar_url: None,
            entries: vec![ReportEntry {
                day_number: 3,
                log_date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
                message: "fixed <div> & shipped".into(),
            }],
            total: 3,
            streak: 2,
            log_command: "$logday".into(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("x < y && z > w"), "x &lt; y &amp;&amp; z &gt; w");
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(
            text_to_telegram_html("Start today by typing `$logday`!"),
            "Start today by typing <code>$logday</code>!"
        );
    }

    #[test]
    fn test_unpaired_backtick_kept() {
        assert_eq!(text_to_telegram_html("it`s <fine>"), "it`s &lt;fine&gt;");
    }

    #[test]
    fn test_code_span_is_escaped() {
        assert_eq!(text_to_telegram_html("`a<b`"), "<code>a&lt;b</code>");
    }

    #[test]
    fn test_report_html() {
        let html = report_to_telegram_html(&report());
        assert!(html.starts_with("<b>ferris log report</b>\n<i>Showing 1 out of 3 logged days</i>\n"));
        assert!(html.contains("<b>Day 3   |   3/7/2024</b>\nfixed &lt;div&gt; &amp; shipped\n"));
        assert!(html.contains("<b>Days completed:</b> 3"));
        assert!(html.contains("<b>Current Streak:</b> 2"));
        assert!(html.ends_with("<i>Add a new log with <code>$logday</code></i>"));
    }

    #[test]
    fn test_split_message_short() {
        let chunks = split_message("short", 4096);
        assert_eq!(chunks, vec!["short"]);
    }

    #[test]
    fn test_split_message_at_newline() {
        let text = format!("{}\n{}", "a".repeat(50), "b".repeat(50));
        let chunks = split_message(&text, 60);
        assert_eq!(chunks, vec!["a".repeat(50), "b".repeat(50)]);
    }

    #[test]
    fn test_split_message_no_newline() {
        let text = "a".repeat(100);
        let chunks = split_message(&text, 60);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 60);
        assert_eq!(chunks[1].len(), 40);
    }

    #[test]
    fn test_split_message_respects_char_boundaries() {
        // 'é' is two bytes; a byte limit of 5 falls inside the third one.
        let text = "é".repeat(6);
        let chunks = split_message(&text, 5);
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_message_empty() {
        assert_eq!(split_message("", 4096), vec![""]);
    }

    #[test]
    fn test_html_to_plain() {
        assert_eq!(html_to_plain("<b>Day 3</b> fixed &lt;div&gt; &amp; shipped"), "Day 3 fixed <div> & shipped");
        assert_eq!(html_to_plain("run <code>cargo</code>"), "run cargo");
        assert_eq!(html_to_plain("a < b"), "a < b");
    }

    #[test]
    fn test_html_to_plain_inverts_escaping() {
        let text = "x < y && y > z";
        assert_eq!(html_to_plain(&text_to_telegram_html(text)), text);
    }
}
