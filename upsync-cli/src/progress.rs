//! Single-line console progress: `[ NN%] path`, rewritten in place.

use std::io::{self, Write};

use upsync_engine::Progress;

#[derive(Debug, Default)]
pub struct ConsoleProgress {
    last_len: usize,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Progress for ConsoleProgress {
    fn item(&mut self, done: usize, total: usize, name: &str) {
        let line = render(done, total, name);
        // Pad over whatever the previous, possibly longer line left behind.
        let pad = self.last_len.saturating_sub(line.len());
        print!("\r{line}{:pad$}", "");
        self.last_len = line.len();
        let _ = io::stdout().flush();
    }

    fn end_batch(&mut self) {
        if self.last_len > 0 {
            println!();
            self.last_len = 0;
        }
    }
}

fn render(done: usize, total: usize, name: &str) -> String {
    let rate = if total == 0 {
        100
    } else {
        done * 100 / total
    };
    format!("[{rate:>2}%] {name}")
}
