use crate::modules::imap::fetch::should_suppress_backlog;
use crate::modules::imap::host::resolve_imap_host;

#[test]
fn known_domains_map_to_provider_hosts() {
    assert_eq!(resolve_imap_host("a@gmail.com"), "imap.gmail.com");
    assert_eq!(resolve_imap_host("a@googlemail.com"), "imap.gmail.com");
    assert_eq!(resolve_imap_host("a@gmx.at"), "imap.gmx.net");
    assert_eq!(resolve_imap_host("a@web.de"), "imap.web.de");
    assert_eq!(resolve_imap_host("a@yahoo.co.uk"), "imap.mail.yahoo.com");
    assert_eq!(resolve_imap_host("a@bk.ru"), "imap.mail.ru");
    assert_eq!(resolve_imap_host("a@hotmail.com"), "outlook.office365.com");
    assert_eq!(resolve_imap_host("a@me.com"), "imap.mail.me.com");
    assert_eq!(resolve_imap_host("a@aol.com"), "imap.aol.com");
}

#[test]
fn lookup_is_case_insensitive() {
    assert_eq!(resolve_imap_host("a@GMail.COM"), "imap.gmail.com");
}

#[test]
fn unknown_domains_use_the_imap_prefix_guess() {
    assert_eq!(resolve_imap_host("a@example.org"), "imap.example.org");
    assert_eq!(resolve_imap_host("a@mail.company.de"), "imap.mail.company.de");
}

#[test]
fn malformed_addresses_fall_back() {
    assert_eq!(resolve_imap_host("not-an-address"), "imap.gmail.com");
}

#[test]
fn backlog_is_swallowed_only_on_a_virgin_first_pass() {
    // Fresh account with a backlog of N unseen and nothing recorded.
    assert!(should_suppress_backlog(true, false, 5));

    // One previously recorded message means the backlog was seen once
    // already; it must be reported, not swallowed.
    assert!(!should_suppress_backlog(true, true, 5));

    // An empty inbox leaves nothing to swallow.
    assert!(!should_suppress_backlog(true, false, 0));

    // Without the first-pass flag the question never arises.
    assert!(!should_suppress_backlog(false, false, 5));
}
