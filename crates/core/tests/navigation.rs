//! End-to-end navigation against an in-memory site, on a paused clock.

mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use common::{engine, engine_with, url};
use pretty_assertions::assert_eq;
use segue_core::dom::SelectorList;
use segue_core::progress::ProgressState;
use segue_core::{
    Anchor, ApplyPhase, ClickEvent, EngineConfig, NavigationError, NavigationOutcome,
};

fn container() -> SelectorList {
    SelectorList::parse(".container").unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_navigate_applies_page() {
    let engine = engine();
    let outcome = engine.navigate_to("/pages/shop.html").await;
    assert_eq!(outcome, NavigationOutcome::Applied(url("/pages/shop.html")));

    let page = engine.page();
    assert_eq!(page.title(), "Word Shop");
    assert_eq!(page.location(), &url("/pages/shop.html"));
    let content = page.container(&container()).unwrap();
    assert!(content.inner_html().contains("Coins: 120"));
    assert!(!content.has_class("pjax-transitioning"));
    assert!(!content.has_class("pjax-loaded"));

    // Shell nav and toast moved into the extras root and were replaced.
    let doc = page.document();
    assert!(doc.find(&|n| n.get_attr("id") == Some("gacha-modal")).is_some());
    assert!(doc.find(&|n| n.get_attr("id") == Some("toast")).is_none());
    assert!(doc.find(&|n| n.is_tag("footer")).is_some());

    // Only the page's own stylesheet was added.
    let links: Vec<&str> = doc
        .find_all(&|n| n.is_tag("link"))
        .iter()
        .filter_map(|l| l.get_attr("href"))
        .collect();
    assert_eq!(links, vec!["/css/base.css", "../css/shop.css"]);

    assert_eq!(page.history().len(), 2);
    assert_eq!(page.scroll().y, 0);
    drop(page);

    assert_eq!(engine.phase(), ApplyPhase::Idle);
    assert_eq!(
        engine.progress_trail(),
        vec![
            ProgressState::Active(30),
            ProgressState::Active(60),
            ProgressState::Active(100),
            ProgressState::Hidden,
        ]
    );
    assert_eq!(
        engine.transport().headers(),
        vec![("X-PJAX".to_string(), "true".to_string())]
    );
}

#[tokio::test(start_paused = true)]
async fn test_same_url_twice_fetches_once() {
    let engine = engine();
    engine.navigate_to("/pages/shop.html").await;
    engine.navigate_to("/pages/shop.html").await;
    assert_eq!(engine.transport().request_count("/pages/shop.html"), 1);
    assert_eq!(engine.page().history().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cache_evicts_oldest_entry() {
    let engine = engine();
    for i in 0..11 {
        engine.navigate_to(&format!("/gen/{i}")).await;
        assert!(engine.cache_len() <= 10);
    }
    assert!(!engine.is_cached(url("/gen/0").as_str()));
    assert!(engine.is_cached(url("/gen/1").as_str()));

    engine.navigate_to("/gen/10").await;
    assert_eq!(engine.transport().request_count("/gen/10"), 1);
    engine.navigate_to("/gen/0").await;
    assert_eq!(engine.transport().request_count("/gen/0"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cache_forces_refetch() {
    let engine = engine();
    engine.navigate_to("/pages/shop.html").await;
    engine.clear_cache();
    assert_eq!(engine.cache_len(), 0);
    engine.navigate_to("/pages/shop.html").await;
    assert_eq!(engine.transport().request_count("/pages/shop.html"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_newer_navigation_cancels_pending_fetch() {
    let engine = engine();
    let _release = engine.transport().hold("/pages/shop.html");
    let applied = Rc::new(RefCell::new(Vec::new()));
    {
        let applied = Rc::clone(&applied);
        engine.on_navigated(move |event| applied.borrow_mut().push(event.url.path().to_string()));
    }

    let first = engine.navigate_to("/pages/shop.html");
    let second = async {
        // Past the first transition delay, so the first fetch is in flight.
        tokio::time::sleep(Duration::from_millis(350)).await;
        engine.navigate_to("/pages/user-center.html").await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first, NavigationOutcome::Cancelled);
    assert_eq!(second, NavigationOutcome::Applied(url("/pages/user-center.html")));
    assert_eq!(*applied.borrow(), vec!["/pages/user-center.html"]);
    assert_eq!(engine.page().title(), "User Center");
    assert!(!engine.is_cached(url("/pages/shop.html").as_str()));
    assert_eq!(engine.page().history().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_superseded_during_transition_never_fetches() {
    let engine = engine();
    let first = engine.navigate_to("/pages/shop.html");
    let second = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.navigate_to("/pages/user-center.html").await
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first, NavigationOutcome::Cancelled);
    assert!(matches!(second, NavigationOutcome::Applied(_)));
    assert_eq!(engine.transport().requests(), vec!["/pages/user-center.html"]);
}

#[tokio::test(start_paused = true)]
async fn test_http_error_falls_back_to_full_load() {
    let engine = engine();
    let outcome = engine.navigate_to("/pages/broken.html").await;
    assert_eq!(
        outcome,
        NavigationOutcome::FullReload {
            url: url("/pages/broken.html"),
            error: Some(NavigationError::HttpStatus(500)),
        }
    );

    assert_eq!(engine.progress_state(), ProgressState::Hidden);
    assert!(!engine.progress_trail().contains(&ProgressState::Active(100)));
    assert_eq!(engine.phase(), ApplyPhase::Idle);

    let page = engine.page();
    assert_eq!(page.pending_load(), Some(&url("/pages/broken.html")));
    assert_eq!(page.location(), &url("/pages/broken.html"));
    assert_eq!(page.title(), "Word Practice");
    assert!(!page.container(&container()).unwrap().has_class("pjax-transitioning"));
    assert!(!engine.is_cached(url("/pages/broken.html").as_str()));
}

#[tokio::test(start_paused = true)]
async fn test_missing_container_falls_back_to_full_load() {
    let engine = engine();
    let outcome = engine.navigate_to("/pages/maintenance.html").await;
    match outcome {
        NavigationOutcome::FullReload {
            url: target,
            error: Some(NavigationError::MalformedResponse { selector, .. }),
        } => {
            assert_eq!(target, url("/pages/maintenance.html"));
            assert_eq!(selector, ".container");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!engine.progress_trail().contains(&ProgressState::Active(100)));
    assert_eq!(engine.page().pending_load(), Some(&url("/pages/maintenance.html")));
}

#[tokio::test(start_paused = true)]
async fn test_unknown_page_falls_back() {
    let engine = engine();
    let outcome = engine.navigate_to("/missing.html").await;
    assert!(matches!(
        outcome,
        NavigationOutcome::FullReload {
            error: Some(NavigationError::HttpStatus(404)),
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_url_is_rejected_without_side_effects() {
    let engine = engine();
    let outcome = engine.navigate_to("http://[::1").await;
    assert!(matches!(
        outcome,
        NavigationOutcome::Rejected(NavigationError::InvalidUrl(_))
    ));
    assert!(engine.transport().requests().is_empty());
    assert!(engine.page().pending_load().is_none());
    assert_eq!(engine.progress_trail(), vec![ProgressState::Hidden]);
}

#[tokio::test(start_paused = true)]
async fn test_back_and_forward_replay_from_cache() {
    let engine = engine();
    engine.navigate_to("/pages/shop.html").await;
    engine.navigate_to("/pages/user-center.html").await;
    assert_eq!(engine.page().history().len(), 3);

    let outcome = engine.back().await;
    assert_eq!(outcome, NavigationOutcome::Applied(url("/pages/shop.html")));
    assert_eq!(engine.page().title(), "Word Shop");
    assert_eq!(engine.page().history().len(), 3);
    assert_eq!(engine.page().history().index(), 1);

    let outcome = engine.forward().await;
    assert_eq!(outcome, NavigationOutcome::Applied(url("/pages/user-center.html")));
    assert_eq!(engine.page().history().len(), 3);

    assert_eq!(engine.transport().request_count("/pages/shop.html"), 1);
    assert_eq!(engine.transport().request_count("/pages/user-center.html"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_back_keeps_forward_entries() {
    let engine = engine();
    engine.navigate_to("/pages/shop.html").await;
    engine.navigate_to("/pages/user-center.html").await;
    engine.clear_cache();
    engine
        .transport()
        .serve("/pages/shop.html", 500, "<h1>Internal Server Error</h1>");

    let outcome = engine.back().await;
    assert!(matches!(outcome, NavigationOutcome::FullReload { .. }));
    {
        let page = engine.page();
        assert_eq!(page.pending_load(), Some(&url("/pages/shop.html")));
        assert_eq!(page.history().len(), 3);
        assert_eq!(page.history().index(), 1);
        let paths: Vec<&str> = page.history().entries().iter().map(|e| e.url.path()).collect();
        assert_eq!(paths, vec!["/index.html", "/pages/shop.html", "/pages/user-center.html"]);
    }

    let outcome = engine.forward().await;
    assert_eq!(outcome, NavigationOutcome::Applied(url("/pages/user-center.html")));
    assert_eq!(engine.page().history().index(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_back_to_first_page_is_replayed() {
    let engine = engine();
    engine.navigate_to("/pages/shop.html").await;
    let outcome = engine.back().await;
    assert_eq!(outcome, NavigationOutcome::Applied(url("/index.html")));
    assert_eq!(engine.page().title(), "Word Practice");
    assert_eq!(engine.transport().request_count("/index.html"), 1);
    assert_eq!(engine.back().await, NavigationOutcome::Ignored);
}

#[tokio::test(start_paused = true)]
async fn test_untagged_history_entry_is_ignored() {
    let engine = engine();
    let event = segue_core::history::PopStateEvent {
        url: url("/pages/shop.html"),
        state: None,
    };
    assert_eq!(engine.pop_state(&event).await, NavigationOutcome::Ignored);
    assert!(engine.transport().requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_click_interception() {
    let engine = engine();
    let same_page = ClickEvent::on_link(Anchor::new("/index.html"));
    assert_eq!(engine.click(&same_page).await, NavigationOutcome::Prevented);

    let external = ClickEvent::on_link(Anchor::new("https://elsewhere.example/"));
    assert_eq!(engine.click(&external).await, NavigationOutcome::Ignored);

    let mut ctrl_click = ClickEvent::on_link(Anchor::new("/pages/shop.html"));
    ctrl_click.modifiers.ctrl = true;
    assert_eq!(engine.click(&ctrl_click).await, NavigationOutcome::Ignored);
    assert!(engine.transport().requests().is_empty());

    let anchor = {
        let page = engine.page();
        let node = page
            .document()
            .find(&|n| n.get_attr("id") == Some("to-shop"))
            .unwrap();
        Anchor::from_node(node).unwrap()
    };
    let outcome = engine.click(&ClickEvent::on_link(anchor)).await;
    assert_eq!(outcome, NavigationOutcome::Applied(url("/pages/shop.html")));
}

#[tokio::test(start_paused = true)]
async fn test_disable_stops_interception_only() {
    let engine = engine();
    engine.navigate_to("/pages/shop.html").await;
    engine.disable();
    assert!(!engine.is_listening());

    let click = ClickEvent::on_link(Anchor::new("/pages/user-center.html"));
    assert_eq!(engine.click(&click).await, NavigationOutcome::Ignored);
    assert_eq!(engine.back().await, NavigationOutcome::Ignored);

    let outcome = engine.navigate_to("/pages/user-center.html").await;
    assert!(matches!(outcome, NavigationOutcome::Applied(_)));
}

#[tokio::test(start_paused = true)]
async fn test_kill_switch_uses_full_loads() {
    let engine = engine_with(EngineConfig {
        enabled: false,
        ..EngineConfig::default()
    });
    let outcome = engine.navigate_to("/pages/shop.html").await;
    assert_eq!(
        outcome,
        NavigationOutcome::FullReload {
            url: url("/pages/shop.html"),
            error: None,
        }
    );
    assert!(engine.transport().requests().is_empty());

    let page = engine.page();
    assert_eq!(page.pending_load(), Some(&url("/pages/shop.html")));
    assert!(page.document().find(&|n| n.has_class("pjax-progress-bar")).is_none());
    assert!(page.history().entries()[0].state.is_none());
    drop(page);

    let click = ClickEvent::on_link(Anchor::new("/pages/user-center.html"));
    assert_eq!(engine.click(&click).await, NavigationOutcome::Ignored);
}

#[tokio::test(start_paused = true)]
async fn test_live_page_without_container_falls_back() {
    let page = segue_core::Page::from_html(
        "<html><head><title>Bare</title></head><body><main>x</main></body></html>",
        url("/bare.html"),
    );
    let engine = segue_core::Engine::new(
        EngineConfig::default(),
        common::SiteTransport::new(),
        common::RecordingRuntime::default(),
        page,
    )
    .unwrap();
    let outcome = engine.navigate_to("/pages/shop.html").await;
    assert!(matches!(
        outcome,
        NavigationOutcome::FullReload {
            error: Some(NavigationError::Apply(_)),
            ..
        }
    ));
    assert!(engine.transport().requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_progress_bar_can_be_turned_off() {
    let engine = engine_with(EngineConfig {
        enable_progress_bar: false,
        ..EngineConfig::default()
    });
    engine.navigate_to("/pages/shop.html").await;
    let page = engine.page();
    assert!(page.document().find(&|n| n.has_class("pjax-progress-bar")).is_none());
    assert!(page.document().find(&|n| n.has_attr("data-pjax-progress")).is_none());
}
