//! Plain-text renderings of posts state for the terminal.

use crate::cache::QuerySnapshot;
use crate::domain::entities::PostRecord;

/// Render a post list, or the loading line while the first load is pending.
/// An empty list renders as an empty string.
pub fn post_list<'a>(
    is_loading: bool,
    posts: impl IntoIterator<Item = &'a PostRecord>,
) -> String {
    if is_loading {
        return "loading posts...\n".to_string();
    }
    let mut out = String::new();
    for post in posts {
        out.push_str(&format!("#{} {}\n    {}\n", post.id, post.title, post.desc));
    }
    out
}

/// Render a query snapshot. Loading only shows while there is no data yet;
/// a refetch keeps showing the previous list. A rejected snapshot without
/// data renders the same as an empty list.
pub fn query_view(snapshot: &QuerySnapshot<PostRecord>) -> String {
    match &snapshot.data {
        Some(posts) => post_list(snapshot.is_loading(), posts.iter()),
        None => post_list(snapshot.is_loading(), []),
    }
}
