use std::borrow::Cow;

/// Normalize path separators to forward slashes.
///
/// Applied at every breakpoint-store and wire boundary so the same file
/// always maps to the same key. Casing is left untouched; case folding is
/// the host collaborator's concern.
pub fn normalise_path(path: &str) -> Cow<'_, str> {
    if path.contains('\\') {
        Cow::Owned(path.replace('\\', "/"))
    } else {
        Cow::Borrowed(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslashes_become_forward_slashes() {
        assert_eq!(normalise_path(r"src\main.tt"), "src/main.tt");
        assert_eq!(normalise_path("src/main.tt"), "src/main.tt");
    }

    #[test]
    fn casing_is_untouched() {
        assert_eq!(normalise_path(r"C:\Work\App.tt"), "C:/Work/App.tt");
    }
}
