//! A scrolling news feed assembled from both composition layers.
//!
//! A paged source loads headlines on a worker thread; the presentation side
//! wraps the bound rows with a header, inner dividers, and a loading
//! indicator that disappears once the feed catches up. Each render pass
//! reads rows with presentation gets, which is what pulls the next page in.
//!
//! ```sh
//! cargo run --example feed
//! RUST_LOG=trellis=trace cargo run --example feed
//! ```

use std::time::Duration;

use trellis::adapter::{
    Adapter, AdapterExt, BoundAdapter, LoadingBuilder, Renderer, ViewHandle, ViewItem, ViewKind,
};
use trellis::data::{Data, IncrementalData, Page, Remaining};

const TOTAL: usize = 12;
const PAGE: usize = 4;

struct Headline {
    kind: ViewKind,
}

impl Renderer<String> for Headline {
    fn view_kind(&self, _item: &String, _position: usize) -> ViewKind {
        self.kind.clone()
    }

    fn create_view(&self, kind: &ViewKind) -> Option<ViewHandle> {
        (*kind == self.kind).then(|| Box::new(String::new()) as ViewHandle)
    }

    fn bind_view(&self, view: &mut ViewHandle, item: &String, _position: usize) {
        *view.downcast_mut::<String>().unwrap() = item.clone();
    }
}

fn text_row(text: &'static str) -> ViewItem {
    ViewItem::new(move || Box::new(text.to_string()) as ViewHandle).decorative()
}

fn render(adapter: &impl Adapter) {
    for position in 0..adapter.count() {
        let kind = adapter.view_kind(position);
        let mut view = adapter.create_view(&kind);
        adapter.bind_view(position, &mut view);
        let text = view.downcast_ref::<String>().unwrap();
        let marker = if adapter.is_interactive(position) {
            ' '
        } else {
            '·'
        };
        println!("  {marker} {text}");
    }
    println!();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let feed = IncrementalData::new(|loaded| {
        // Stand-in for a network fetch.
        std::thread::sleep(Duration::from_millis(40));
        let next = (loaded + PAGE).min(TOTAL);
        Ok(Page {
            items: (loaded..next).map(|n| format!("headline #{n}")).collect(),
            remaining: Remaining::Exactly(TOTAL - next),
        })
    });

    // The worker posts each page to the owner queue; the hook tells this
    // thread a drain is due.
    let (wake_tx, wake_rx) = crossbeam_channel::bounded::<()>(1);
    feed.owner_queue().set_wake_hook(move || {
        let _ = wake_tx.try_send(());
    });

    let rows = BoundAdapter::new(
        feed.clone(),
        Headline {
            kind: ViewKind::new(),
        },
    );
    let divided = rows.dividers(text_row("────────────")).inner().build();
    let with_spinner = LoadingBuilder::new(divided, text_row("loading…")).build(&feed);
    let composed = with_spinner
        .headers_footers()
        .header(text_row("== the trellis gazette =="))
        .build();

    // The first rows observer activates the chain and starts the worker.
    composed.on_rows(|event| println!("rows event: {event:?}"));

    println!("initial frame:");
    render(&composed);

    while wake_rx.recv_timeout(Duration::from_secs(1)).is_ok() {
        feed.owner_queue().drain();
        render(&composed);
        if feed.available().is_complete() && !feed.is_loading() {
            break;
        }
    }

    println!(
        "done: {} headlines, {} rows presented",
        feed.size(),
        composed.count()
    );
}
