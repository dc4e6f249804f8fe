//! End-to-end tests for the public API: budgeting a conversation, streaming
//! a response through the splitter, and a full session round trip.

use thinkrelay::annotation::{Markers, extract, strip_annotation};
use thinkrelay::context::{BudgetConfig, BudgetError, PromptBudgeter};
use thinkrelay::prompt::{FnCounter, FnTemplate};
use thinkrelay::stream::{StreamEvent, consume};
use thinkrelay::{ChatMessage, Turn};

/// Joins `role\ncontent` blocks with newlines.
fn newline_template() -> FnTemplate<impl Fn(&[ChatMessage]) -> String> {
    FnTemplate::new(|msgs: &[ChatMessage]| {
        msgs.iter()
            .map(|m| format!("{}\n{}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

// ── Budgeting ───────────────────────────────────────────────────────

#[test]
fn single_greeting_fits_default_budget() {
    let history = vec![Turn::user("hi")];
    let built = PromptBudgeter::new(BudgetConfig::default().with_max_tokens(8192))
        .build(
            "You are helpful.",
            &history,
            &newline_template(),
            &FnCounter::new(|s: &str| s.len() / 4),
        )
        .unwrap();

    assert!(!built.truncated);
    assert_eq!(built.history, history);
    assert!(!built.prompt_text.contains("<!-- snip -->"));
}

#[test]
fn twenty_exchanges_shrink_two_turns_at_a_time() {
    let mut history = Vec::new();
    for i in 0..20 {
        history.push(Turn::user(format!("{i:02}{}", "u".repeat(998))));
        history.push(Turn::assistant(format!("{i:02}{}", "a".repeat(998))));
    }

    let built = PromptBudgeter::new(BudgetConfig::default().with_max_tokens(5000))
        .build(
            "",
            &history,
            &newline_template(),
            &FnCounter::new(|s: &str| s.len()),
        )
        .unwrap();

    assert!(built.truncated);
    assert!(built.tokens <= 5000);
    assert_eq!(built.prompt_text.len(), built.tokens);
    assert_eq!(built.dropped_turns % 2, 0);
    assert_eq!(built.history[0], history[0]);
    assert_eq!(built.history.last(), history.last());
    // The caller's history is untouched.
    assert_eq!(history.len(), 40);
}

#[test]
fn too_large_iff_minimal_history_does_not_fit() {
    let template = newline_template();
    let counter = FnCounter::new(|s: &str| s.len());
    let history = vec![
        Turn::user("anchor"),
        Turn::assistant("x".repeat(300)),
        Turn::user("y".repeat(300)),
    ];

    // The anchor alone (plus elision marker) is the smallest prompt tried.
    let minimal = "<!-- snip -->\nsystem\n\nuser\nanchor\n".to_string();
    let fits = PromptBudgeter::new(BudgetConfig::default().with_max_tokens(minimal.len()))
        .build("", &history, &template, &counter);
    assert_eq!(fits.unwrap().prompt_text, minimal);

    let fails = PromptBudgeter::new(BudgetConfig::default().with_max_tokens(minimal.len() - 1))
        .build("", &history, &template, &counter);
    assert!(matches!(fails, Err(BudgetError::PromptTooLarge { .. })));
}

#[test]
fn rendered_messages_never_contain_markers() {
    let markers = Markers::default();
    let seen = std::cell::RefCell::new(Vec::<String>::new());
    let template = FnTemplate::new(|msgs: &[ChatMessage]| {
        seen.borrow_mut().extend(msgs.iter().map(|m| m.content.clone()));
        msgs.iter().map(|m| m.content.as_str()).collect::<String>()
    });
    let history = vec![
        Turn::user("q1"),
        Turn::assistant("<think>long deliberation</think>a1"),
        Turn::user("q2"),
        Turn::assistant("<think>unfinished"),
        Turn::user("q3"),
    ];

    // Too small to ever fit, so every truncation step gets rendered.
    let result = PromptBudgeter::new(BudgetConfig::default().with_max_tokens(6)).build(
        "<think>meta</think>sys",
        &history,
        &template,
        &FnCounter::new(|s: &str| s.len()),
    );
    assert!(matches!(result, Err(BudgetError::PromptTooLarge { turns: 1, .. })));

    let seen = seen.borrow();
    assert!(seen.contains(&"sys".to_string()));
    assert!(seen.iter().all(|c| !markers.appear_in(c)));
}

#[test]
fn every_reasoning_block_is_stripped_from_the_prompt() {
    let template = FnTemplate::new(|msgs: &[ChatMessage]| {
        msgs.iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("|")
    });
    let history = vec![
        Turn::user("q"),
        Turn::assistant("<think>plan A</think>first<think>secret plan B</think>second"),
        Turn::user("q2"),
    ];

    let built = PromptBudgeter::new(BudgetConfig::default())
        .build("sys", &history, &template, &FnCounter::new(|s: &str| s.len()))
        .unwrap();

    assert_eq!(built.prompt_text, "sys|q|firstsecond|q2\n");
    assert!(!Markers::default().appear_in(&built.prompt_text));
    // The committed history keeps the raw text.
    assert_eq!(built.history, history);
}

// ── Streaming ───────────────────────────────────────────────────────

#[tokio::test]
async fn streamed_chunks_surface_progressively() {
    let chunks = ["<thi", "nk>reasoning", "</think> answer"];
    let source = futures::stream::iter(
        chunks
            .iter()
            .map(|c| Ok::<_, std::io::Error>(StreamEvent::TextDelta(c.to_string()))),
    );

    let mut snapshots = Vec::new();
    let done = consume(source, &Markers::default(), |r| {
        snapshots.push((r.annotation.clone(), r.visible.clone()))
    })
    .await
    .unwrap();

    assert_eq!(
        snapshots,
        vec![
            (String::new(), "<thi".to_string()),
            ("reasoning".to_string(), String::new()),
            ("reasoning".to_string(), "answer".to_string()),
        ]
    );
    assert_eq!(strip_annotation(&done.raw_text, &Markers::default()), "answer");
}

#[test]
fn visible_text_only_grows_after_annotation_closes() {
    let markers = Markers::default();
    let full = "<think>plan</think> The capital of France is Paris.";
    let close = full.find("</think>").unwrap() + "</think>".len();

    let mut previous = String::new();
    for cut in close..=full.len() {
        if !full.is_char_boundary(cut) {
            continue;
        }
        let visible = extract(&full[..cut], &markers).visible;
        assert!(visible.starts_with(previous.trim_end()));
        previous = visible;
    }
}

// ── Session ─────────────────────────────────────────────────────────

#[test]
fn session_round_trip() {
    use thinkrelay::config::ChatConfig;
    use thinkrelay::session::ChatSession;

    let mut session = ChatSession::new(ChatConfig::default());
    let first = session.submit("What is 2 + 2?").unwrap();
    assert!(first.prompt.contains("What is 2 + 2?"));

    for delta in ["<think>", "add them", "</think>", "4"] {
        session.push_chunk(delta);
    }
    let metrics = *session.finish();
    assert!(metrics.total_duration().is_some());

    let second = session.submit("Times 3?").unwrap();
    assert!(second.prompt.contains(" 4 </s>"));
    assert!(!second.prompt.contains("add them"));
    assert_eq!(session.history().len(), 3);
}
