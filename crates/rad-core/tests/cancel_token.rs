use std::fs;

use rad_core::CancelToken;

#[test]
fn clones_share_the_flag() {
    let token = CancelToken::new();
    let observer = token.clone();
    assert!(!observer.is_cancelled());
    token.cancel();
    assert!(observer.is_cancelled());
}

#[test]
fn sentinel_file_requests_stop() {
    let dir = tempfile::tempdir().unwrap();
    let sentinel = dir.path().join("STOP");
    let token = CancelToken::new().with_sentinel(&sentinel);
    assert!(!token.is_cancelled());

    fs::write(&sentinel, b"").unwrap();
    assert!(token.is_cancelled());

    fs::remove_file(&sentinel).unwrap();
    assert!(token.is_cancelled(), "a stop request is sticky");
}
