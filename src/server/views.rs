use crate::pdf::MergeOrder;
use crate::server::{MERGE_FIELD, SPLIT_FIELD};

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} - PDF Split &amp; Merge</title>
</head>
<body>
<nav><a href="/">Home</a> | <a href="/download">Downloads</a> | <a href="/about">About</a></nav>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
        body = body,
    )
}

/// The upload form, optionally with an error message above it.
pub fn index(error_message: Option<&str>) -> String {
    let error = error_message
        .map(|msg| format!(r#"<p class="error" role="alert">{}</p>"#, escape(msg)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>PDF Split &amp; Merge</h1>
{error}
<section>
<h2>Split a PDF</h2>
<form action="/split" method="post" enctype="multipart/form-data">
<input type="file" name="{split}" accept=".pdf,application/pdf">
<button type="submit">Split</button>
</form>
</section>
<section>
<h2>Merge PDFs</h2>
<form action="/merge" method="post" enctype="multipart/form-data">
<input type="file" name="{merge}" accept=".pdf,application/pdf" multiple>
<button type="submit">Merge</button>
</form>
</section>"#,
        error = error,
        split = SPLIT_FIELD,
        merge = MERGE_FIELD,
    );
    layout("Home", &body)
}

/// Links to every file in the caller's outgoing storage.
pub fn download(files: &[String]) -> String {
    let body = if files.is_empty() {
        "<h1>Downloads</h1>\n<p>No files available.</p>".to_string()
    } else {
        let items: String = files
            .iter()
            .map(|name| {
                let name = escape(name);
                format!(r#"<li><a href="/download/{name}" download>{name}</a></li>"#)
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("<h1>Downloads</h1>\n<ul>\n{}\n</ul>", items)
    };
    layout("Downloads", &body)
}

pub fn about(order: MergeOrder) -> String {
    let order_note = match order {
        MergeOrder::Forward => "Merged pages follow the order the files were uploaded in.",
        MergeOrder::Reversed => "Merged pages start with the last file uploaded.",
    };
    let body = format!(
        "<h1>About</h1>\n\
         <p>Upload a PDF to split it into one file per page, or upload two or more PDFs \
         to merge them into a single document. {} Files are kept only until you return \
         to the home page.</p>",
        order_note
    );
    layout("About", &body)
}

pub fn not_found() -> String {
    layout("Not found", "<h1>Not found</h1>\n<p>No such file.</p>")
}
