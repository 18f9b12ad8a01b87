use std::path::{Path, PathBuf};

use notebook_chat::template::resolve_template_path;

#[test]
fn relative_paths_join_base_dir() {
    let resolved = resolve_template_path("docs/a.md", Path::new("/work")).expect("resolve");

    assert_eq!(resolved, PathBuf::from("/work/docs/a.md"));
}

#[test]
fn dot_segments_are_dropped() {
    let resolved = resolve_template_path("./docs/./a.md", Path::new("/work")).expect("resolve");

    assert_eq!(resolved, PathBuf::from("/work/docs/a.md"));
}

#[cfg(unix)]
#[test]
fn absolute_paths_are_kept() {
    let resolved = resolve_template_path("/etc/hosts", Path::new("/work")).expect("resolve");

    assert_eq!(resolved, PathBuf::from("/etc/hosts"));
}

#[cfg(unix)]
#[test]
fn backslash_separators_split_segments() {
    let resolved =
        resolve_template_path("docs\\nested\\a.md", Path::new("/work")).expect("resolve");

    assert_eq!(resolved, PathBuf::from("/work/docs/nested/a.md"));
}

#[test]
fn surrounding_whitespace_is_trimmed() {
    let resolved = resolve_template_path("  a.md  ", Path::new("/work")).expect("resolve");

    assert!(resolved.ends_with("a.md"));
}

#[test]
fn empty_path_is_rejected() {
    let result = resolve_template_path("   ", Path::new("/work"));

    assert!(result.is_err());
}

#[test]
fn tilde_inside_a_name_is_literal() {
    let resolved = resolve_template_path("~backup.txt", Path::new("/work")).expect("resolve");

    assert_eq!(resolved, PathBuf::from("/work/~backup.txt"));
}

#[cfg(unix)]
#[test]
#[serial_test::serial]
fn tilde_prefix_uses_home_directory() {
    let previous = std::env::var_os("HOME");
    std::env::set_var("HOME", "/home/tester");

    let resolved = resolve_template_path("~/x/y.txt", Path::new("/work"));
    let bare = resolve_template_path("~", Path::new("/work"));

    match previous {
        Some(value) => std::env::set_var("HOME", value),
        None => std::env::remove_var("HOME"),
    }
    assert_eq!(resolved.expect("resolve"), PathBuf::from("/home/tester/x/y.txt"));
    assert_eq!(bare.expect("resolve"), PathBuf::from("/home/tester"));
}
