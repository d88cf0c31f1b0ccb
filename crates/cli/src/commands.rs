use datafacade::{BlockView, MmapMemoryAllocator};

/// Number of payload bytes shown by `GET`.
const PREVIEW_BYTES: usize = 16;

/// Result of executing one input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    /// Print the text and keep reading commands.
    Continue(String),
    /// Print the text and stop.
    Exit(String),
}

/// Executes a single REPL line against `allocator`.
///
/// Returns `None` for blank lines.
pub fn execute(allocator: &MmapMemoryAllocator, line: &str) -> Option<Step> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next()?;
    let index = allocator.get_index();

    let step = match cmd.to_uppercase().as_str() {
        "GET" => match parts.next() {
            Some(name) => match index.resolve(name) {
                Ok(view) => Step::Continue(describe(&view)),
                Err(e) => Step::Continue(format!("ERR {}", e)),
            },
            None => Step::Continue("ERR usage: GET name".to_string()),
        },
        "LIST" => {
            let names = index.block_names();
            let mut out = String::new();
            for name in &names {
                out.push_str(name);
                out.push('\n');
            }
            out.push_str(&format!("({} blocks)", names.len()));
            Step::Continue(out)
        }
        "FILES" => {
            let files = allocator.mapped_files();
            let mut out = String::new();
            for path in files {
                out.push_str(&format!("{}\n", path.display()));
            }
            out.push_str(&format!("({} files)", files.len()));
            Step::Continue(out)
        }
        "FILEINDEX" => Step::Continue(allocator.file_index_path().to_string()),
        "STATS" => Step::Continue(format!("{:?}", allocator)),
        "EXIT" | "QUIT" => Step::Exit("bye".to_string()),
        other => Step::Continue(format!("unknown command: {}", other)),
    };
    Some(step)
}

fn describe(view: &BlockView<'_>) -> String {
    let preview: Vec<String> = view
        .as_bytes()
        .iter()
        .take(PREVIEW_BYTES)
        .map(|b| format!("{:02x}", b))
        .collect();
    format!(
        "region={} offset={} size={} count={} [{}]",
        view.region(),
        view.byte_offset(),
        view.byte_size(),
        view.element_count(),
        preview.join(" ")
    )
}
