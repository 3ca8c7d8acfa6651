use std::sync::Arc;

use selectorkit::builder::SelectorBuilder;
use selectorkit::dependency::Dependency;
use selectorkit::key::Opaque;

#[derive(Debug, Clone)]
struct Post {
    id: u64,
    site_id: u64,
}

struct AppState {
    posts: Arc<Vec<Post>>,
    sites: Arc<Vec<u64>>,
}

fn main() {
    env_logger::init();

    let mut posts_for_site = SelectorBuilder::new(|state: &Arc<AppState>, args: &(u64,)| {
        state
            .posts
            .iter()
            .filter(|p| p.site_id == args.0)
            .map(|p| p.id)
            .collect::<Vec<_>>()
    })
    .dependant(|state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.posts))
    .dependant(|state: &Arc<AppState>, _: &(u64,)| Dependency::shared(&state.sites))
    .build();

    let sites = Arc::new(vec![10, 11]);
    let mut state = Arc::new(AppState {
        posts: Arc::new(vec![
            Post { id: 1, site_id: 10 },
            Post { id: 2, site_id: 11 },
        ]),
        sites: Arc::clone(&sites),
    });

    println!("site 10: {:?}", posts_for_site.select(&state, (10,)));

    // replacing only the posts slice invalidates the chain; the old posts
    // allocation dies with the overwritten state
    state = Arc::new(AppState {
        posts: Arc::new(vec![
            Post { id: 1, site_id: 10 },
            Post { id: 3, site_id: 10 },
        ]),
        sites: Arc::clone(&sites),
    });
    println!("site 10: {:?}", posts_for_site.select(&state, (10,)));

    // stale entries for the dropped posts slice can be swept explicitly
    println!("swept {} dead slots", posts_for_site.prune_stale());

    // in debug builds, complex arguments trip a log warning because the
    // default cache key cannot tell them apart (run with RUST_LOG=warn)
    let mut tagged = SelectorBuilder::new(|state: &Arc<AppState>, _: &(Opaque<Vec<u64>>,)| {
        state.posts.len()
    })
    .dependant(|state: &Arc<AppState>, _: &(Opaque<Vec<u64>>,)| Dependency::shared(&state.posts))
    .build();
    println!("tagged: {}", tagged.select(&state, (Opaque(vec![1, 2]),)));
}
