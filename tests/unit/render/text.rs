use super::*;

fn mono(px_per_char: f32) -> impl FnMut(&str) -> ShortsResult<f32> {
    move |s: &str| Ok(s.chars().count() as f32 * px_per_char)
}

#[test]
fn numbered_point_with_title_is_reformatted() {
    assert_eq!(
        display_text("2. **Sleep**: Aim for eight hours"),
        "2. Sleep: Aim for eight hours"
    );
    assert_eq!(
        display_text("10: **Hydrate** Drink water\nall day"),
        "10. Hydrate: Drink water\nall day"
    );
}

#[test]
fn plain_and_untitled_lines_are_unchanged() {
    assert!(matches!(display_text("Just a sentence."), Cow::Borrowed(_)));
    assert_eq!(display_text("3. No bold title here"), "3. No bold title here");
    assert_eq!(display_text("**Title** without number"), "**Title** without number");
}

#[test]
fn numbered_point_without_content_keeps_title() {
    assert_eq!(display_text("4. **Stretch**"), "4. Stretch");
}

#[test]
fn wrap_is_greedy_and_strictly_under_budget() {
    // 10px per char, budget 100px => candidates must be < 10 chars.
    let lines = wrap_words("aaa bbb ccc ddd eeeeeeeee", 100.0, mono(10.0)).unwrap();
    assert_eq!(lines, vec!["aaa bbb", "ccc ddd", "eeeeeeeee"]);
}

#[test]
fn overlong_word_gets_its_own_line() {
    let lines = wrap_words("hi supercalifragilistic yo", 50.0, mono(10.0)).unwrap();
    assert_eq!(lines, vec!["hi", "supercalifragilistic", "yo"]);
}

#[test]
fn wrap_of_blank_text_is_empty() {
    assert!(wrap_words("   ", 100.0, mono(10.0)).unwrap().is_empty());
}

#[test]
fn wrap_propagates_measure_errors() {
    let err = wrap_words("a b", 100.0, |_| Err(ShortsError::resource("no font")));
    assert!(err.is_err());
}
