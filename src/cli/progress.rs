use mend::contexts::RunSummary;
use std::time::Instant;

pub struct ProgressIndicator {
    total: usize,
    started: usize,
    failed: usize,
    start_time: Instant,
}

impl ProgressIndicator {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            started: 0,
            failed: 0,
            start_time: Instant::now(),
        }
    }

    pub fn start_item(&mut self, name: &str) {
        self.started += 1;
        println!("Patching: {} ({}/{})", name, self.started, self.total);
    }

    pub fn complete_item(&mut self, _name: &str, success: bool) {
        if !success {
            self.failed += 1;
        }
    }

    pub fn finish(&self, summary: &RunSummary) {
        let elapsed = self.start_time.elapsed();
        println!("\n{}", "=".repeat(60));
        println!("Summary:");
        println!("  Files:           {}", self.total);
        println!("  Files patched:   {}", summary.files_patched());
        println!("  Files failed:    {}", self.failed);
        println!("  Records applied: {}", summary.total_applied());
        println!("  Records skipped: {}", summary.total_skipped());
        println!("  Failures:        {}", summary.failure_count());
        println!("  Duration:        {:.2}s", elapsed.as_secs_f64());
        println!("{}", "=".repeat(60));
    }
}
