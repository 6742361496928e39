//! Streaming wire-protocol properties: quote escaping and sentinel handling

use proptest::prelude::*;

use windlass_core::exec::{
    MISSING_STATUS_CODE, StreamAssembler, escape_single_quotes, wrap_streaming_command,
};

/// Reference inverse of the wrapper: what the remote shell reconstructs after
/// removing the single-quote wrapping
fn shell_unwrap(wrapped: &str) -> Option<String> {
    let body = wrapped
        .strip_prefix("script -q /dev/null sh -c '")?
        .strip_suffix("; echo EXIT_CODE:$?'")?;
    Some(body.replace("'\\''", "'"))
}

/// Feeds `full` to an assembler split at the given fractional positions
fn drive_chunked(full: &str, cuts: &[prop::sample::Index]) -> (String, i32) {
    let mut positions: Vec<usize> = cuts.iter().map(|c| c.index(full.len() + 1)).collect();
    positions.push(0);
    positions.push(full.len());
    positions.sort_unstable();
    positions.dedup();

    let mut assembler = StreamAssembler::new();
    let mut forwarded = String::new();
    for window in positions.windows(2) {
        let frame = &full[window[0]..window[1]];
        if let Some(chunk) = assembler.push(frame) {
            forwarded.push_str(&chunk);
        }
    }
    (forwarded, assembler.finish())
}

proptest! {
    /// Wrapping then unwrapping re-produces the original command exactly,
    /// for any command text including embedded single quotes
    #[test]
    fn escaping_round_trips(command in "[ -~]{0,80}") {
        let wrapped = wrap_streaming_command(&command);
        prop_assert_eq!(shell_unwrap(&wrapped), Some(command));
    }

    /// Escaping touches nothing but single quotes
    #[test]
    fn escaping_is_identity_without_quotes(command in "[ -&(-~]{0,80}") {
        prop_assert_eq!(escape_single_quotes(&command), command);
    }

    /// The consumer sees exactly the pre-sentinel content and the right
    /// status, no matter how the stream is cut into frames
    #[test]
    fn sentinel_survives_any_frame_boundaries(
        content in "[a-zA-Z0-9 \\n]{0,60}".prop_filter("no sentinel", |s| !s.contains("EXIT_CODE:")),
        status in 0u8..=255,
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let full = format!("{content}EXIT_CODE:{status}");
        let (forwarded, parsed) = drive_chunked(&full, &cuts);
        prop_assert_eq!(forwarded, content);
        prop_assert_eq!(parsed, i32::from(status));
    }

    /// A stream with no sentinel always reports the failure code
    #[test]
    fn missing_sentinel_reports_failure_code(
        content in "[a-zA-Z0-9 \\n]{0,60}",
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        prop_assume!(!content.contains("EXIT_CODE:"));
        let (_, parsed) = drive_chunked(&content, &cuts);
        prop_assert_eq!(parsed, MISSING_STATUS_CODE);
    }
}

#[test]
fn single_frame_stream_withholds_sentinel() {
    let mut assembler = StreamAssembler::new();
    let mut forwarded = String::new();
    if let Some(chunk) = assembler.push("hello\nworld\nEXIT_CODE:0") {
        forwarded.push_str(&chunk);
    }
    assert_eq!(forwarded, "hello\nworld\n");
    assert_eq!(assembler.finish(), 0);
}
