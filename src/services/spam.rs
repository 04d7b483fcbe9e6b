//! Heuristic spam detection for new comments

const SPAM_KEYWORDS: &[&str] = &[
    "casino",
    "poker",
    "viagra",
    "cialis",
    "lottery",
    "winner",
    "click here",
    "free money",
    "make money",
    "work from home",
    "buy now",
    "limited time",
    "act now",
    "congratulations",
];

/// 评分只使用前 10 个关键词
const SCORED_KEYWORDS: usize = 10;

/// 同一 IP 十分钟内超过该数量的评论计为可疑
pub const RECENT_COMMENTS_THRESHOLD: u64 = 3;

const SPAM_THRESHOLD: u32 = 3;

fn uppercase_count(text: &str) -> usize {
    text.chars().filter(|c| c.is_uppercase()).count()
}

fn has_repeated_lowercase_run(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(5)
        .any(|w| w[0].is_ascii_lowercase() && w.iter().all(|c| *c == w[0]))
}

/// Indicator points; `recent_from_ip` is the number of comments the same IP
/// posted in the last ten minutes.
pub fn spam_indicators(text: &str, recent_from_ip: u64) -> u32 {
    let lower = text.to_lowercase();
    let mut points = SPAM_KEYWORDS.iter().filter(|k| lower.contains(*k)).count() as u32;

    let length = text.chars().count();
    if uppercase_count(text) as f64 > length as f64 * 0.7 {
        points += 1;
    }
    if text.matches("http").count() > 2 {
        points += 2;
    }
    if has_repeated_lowercase_run(text) {
        points += 1;
    }
    if recent_from_ip > RECENT_COMMENTS_THRESHOLD {
        points += 2;
    }
    points
}

pub fn is_spam(text: &str, recent_from_ip: u64) -> bool {
    spam_indicators(text, recent_from_ip) >= SPAM_THRESHOLD
}

/// Weighted 0–100 score used by moderators.
pub fn spam_score(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let keywords = SPAM_KEYWORDS[..SCORED_KEYWORDS]
        .iter()
        .filter(|k| lower.contains(*k))
        .count();

    let length = text.chars().count();
    let caps_ratio = uppercase_count(text) as f64 / length.max(1) as f64;

    let mut score = keywords as f64 * 15.0;
    score += text.matches("http").count() as f64 * 10.0;
    score += caps_ratio * 30.0;
    if !(10..=2000).contains(&length) {
        score += 10.0;
    }
    score.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_comment_is_not_spam() {
        assert!(!is_spam("Thanks for the detailed write-up, very helpful.", 0));
        assert_eq!(spam_indicators("Nice post", 0), 0);
    }

    #[test]
    fn test_keywords_accumulate() {
        let text = "Congratulations WINNER, click here to claim the lottery";
        assert!(spam_indicators(text, 0) >= 4);
        assert!(is_spam(text, 0));
    }

    #[test]
    fn test_links_and_flooding() {
        let links = "see http://a http://b http://c";
        assert_eq!(spam_indicators(links, 0), 2);
        assert!(is_spam(links, 4));
        assert!(!is_spam(links, 3));
    }

    #[test]
    fn test_caps_and_repeats() {
        assert_eq!(spam_indicators("HELLO EVERYONE", 0), 1);
        assert_eq!(spam_indicators("sooooo good", 0), 1);
        // 大写字母重复不计入
        assert_eq!(spam_indicators("ok AAAAA ok ok ok ok", 0), 0);
    }

    #[test]
    fn test_spam_score_weights() {
        assert_eq!(spam_score("short"), 10.0);
        let score = spam_score("visit the casino and play poker tonight");
        assert!((score - 30.0).abs() < f64::EPSILON);
        // "buy now" 不在评分关键词内
        let score = spam_score("please buy now, it is a great deal");
        assert!(score < 1.0);
    }

    #[test]
    fn test_spam_score_is_capped() {
        let text = "CASINO POKER VIAGRA CIALIS LOTTERY WINNER http http http";
        assert_eq!(spam_score(text), 100.0);
    }
}
