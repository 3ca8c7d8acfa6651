use std::sync::Arc;

use selectorkit::builder::create_selector;
use selectorkit::dependency::Dependency;

struct AppState {
    posts: Arc<Vec<(u64, u64)>>, // (post id, site id)
}

fn main() {
    env_logger::init();

    let mut posts_for_site = create_selector(
        |state: &Arc<AppState>, args: &(u64,)| {
            println!("computing for site {}", args.0);
            state
                .posts
                .iter()
                .filter(|p| p.1 == args.0)
                .map(|p| p.0)
                .collect::<Vec<_>>()
        },
        |state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.posts),
    );

    let state = Arc::new(AppState {
        posts: Arc::new(vec![(1, 10), (2, 10), (3, 11)]),
    });

    println!("site 10: {:?}", posts_for_site.select(&state, (10,)));
    println!("site 10: {:?}", posts_for_site.select(&state, (10,)));
    println!("site 11: {:?}", posts_for_site.select(&state, (11,)));
    println!("cached results: {}", posts_for_site.len());
}

// Expected output:
// computing for site 10
// site 10: [1, 2]
// site 10: [1, 2]
// computing for site 11
// site 11: [3]
// cached results: 2
//
// Explanation: the second site-10 read is served from cache; only the new
// cache key (site 11) recomputes.
