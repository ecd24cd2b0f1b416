//! End-to-end scenarios exercising the pieces that `Pipeline` wires together,
//! without hitting any real upstream: context classification, the fixed
//! postprocessor chain, and the coalescing primitives composed the way
//! `ntp-service`'s `run_coalesced` composes them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ntp_core::context;
use ntp_core::fingerprint;
use ntp_core::postprocess::{self, ChainOfThoughtStripper};
use ntp_core::types::ContextClass;
use ntp_core::{LatestOnly, SingleFlight};

fn run_post(prefix: &str, suffix: &str, completion: &str) -> String {
    let context = context::classify(prefix, suffix);
    let cot = ChainOfThoughtStripper::default();
    postprocess::apply(&cot, prefix, suffix, context, completion.to_string()).unwrap()
}

#[test]
fn word_overlap_strips_shared_prefix_tail() {
    let result = run_post("The quick brown ", "", "brown fox jumps");
    assert_eq!(result, "fox jumps");
}

#[test]
fn list_marker_overlap_is_peeled_in_unordered_list_context() {
    let prefix = "- item one\n- ";
    assert_eq!(context::classify(prefix, ""), ContextClass::UnorderedList);
    let result = run_post(prefix, "", "- item two");
    assert_eq!(result, "item two");
}

#[test]
fn code_fences_are_stripped_in_code_block_context() {
    let prefix = "```python\ndef f():\n    ";
    let suffix = "\n```";
    assert_eq!(context::classify(prefix, suffix), ContextClass::CodeBlock);
    let result = run_post(prefix, suffix, "```python\n    return 1\n```");
    assert_eq!(result, "    return 1");
}

#[test]
fn chain_of_thought_is_stripped_before_the_rest_of_the_chain_runs() {
    let cot = ChainOfThoughtStripper::from_str(r"(?s)<think>.*?</think>").unwrap();
    let context = context::classify("", "");
    let result = postprocess::apply(
        &cot,
        "",
        "",
        context,
        "<think>planning</think>hi".to_string(),
    )
    .unwrap();
    assert_eq!(result, "hi");
}

#[test]
fn overlap_removal_is_idempotent() {
    let once = run_post("The quick brown ", "", "brown fox jumps");
    let twice = run_post("The quick brown ", "", &once);
    assert_eq!(once, twice);
}

#[test]
fn whitespace_removal_is_idempotent() {
    let once = run_post("word ", "", "  more text");
    let twice = run_post("word ", "", &once);
    assert_eq!(once, twice);
}

#[test]
fn numbered_list_item_inside_a_code_fence_classifies_as_code_block() {
    // Precedence is load-bearing: CodeBlock must win over NumberedList.
    let prefix = "```python\n1. ";
    let suffix = "\n```";
    assert_eq!(context::classify(prefix, suffix), ContextClass::CodeBlock);
}

#[tokio::test]
async fn identical_concurrent_requests_from_different_users_collapse_to_one_upstream_call() {
    let sf = Arc::new(SingleFlight::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let key = fingerprint::fingerprint("gemini", "gemini-2.5-flash", "The quick brown ", "");

    let mut handles = Vec::new();
    for _user in ["alice", "bob"] {
        let sf = sf.clone();
        let calls = calls.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            sf.run(&key, move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok("fox jumps".to_string())
                }
            })
            .await
        }));
    }

    let mut results = Vec::new();
    for h in handles {
        results.push(h.await.unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| r == "fox jumps"));
}

#[tokio::test]
async fn rapid_typing_burst_issues_at_most_two_upstream_calls_and_resolves_to_the_latest_prefix() {
    let lo = Arc::new(LatestOnly::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let dispatched = Arc::new(std::sync::Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for p in ["a", "ab", "abc", "abcd", "abcde"] {
        let lo = lo.clone();
        let calls = calls.clone();
        let dispatched = dispatched.clone();
        handles.push(tokio::spawn(async move {
            lo.run("typist", ntp_core::CursorContext::new(p, ""), move |ctx| {
                let calls = calls.clone();
                let dispatched = dispatched.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    dispatched.lock().unwrap().push(ctx.prefix.clone());
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    ctx.prefix
                }
            })
            .await
        }));
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let mut results = Vec::new();
    for h in handles {
        results.push(h.await.unwrap());
    }

    assert!(calls.load(Ordering::SeqCst) <= 2);
    assert!(results.iter().all(|r| !r.is_empty()));
    assert_eq!(dispatched.lock().unwrap().last().unwrap(), "abcde");
}
