use fish_quality::{QualityReport, QualityVerdict};

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; }}
img {{ max-width: 100%; border-radius: 4px; }}
table {{ border-collapse: collapse; }}
td {{ padding: 0.3rem 1rem 0.3rem 0; }}
.verdict {{ font-size: 1.5rem; font-weight: bold; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>"#,
        title = escape_html(title),
        body = body
    )
}

pub fn index_page() -> String {
    layout(
        "Fish Quality Check",
        r#"<form id="upload" method="post" action="/preview">
<input type="file" id="picker" accept="image/*" capture="environment">
<input type="hidden" name="image" id="image">
<button type="submit" id="submit" disabled>Upload</button>
</form>
<script>
const picker = document.getElementById("picker");
picker.addEventListener("change", () => {
  const file = picker.files[0];
  if (!file) return;
  const reader = new FileReader();
  reader.onload = () => {
    document.getElementById("image").value = reader.result;
    document.getElementById("submit").disabled = false;
  };
  reader.readAsDataURL(file);
});
</script>"#,
    )
}

pub fn preview_page(filename: &str) -> String {
    let filename = escape_html(filename);
    layout(
        "Preview",
        &format!(
            r#"<img src="/uploads/{filename}" alt="uploaded fish">
<p><a href="/analyze">Analyze</a> &middot; <a href="/">Upload another</a></p>"#
        ),
    )
}

fn verdict_badge(verdict: QualityVerdict) -> &'static str {
    match verdict {
        QualityVerdict::Good => "GOOD ✅",
        QualityVerdict::Average => "AVERAGE ⚠️",
        QualityVerdict::Poor => "POOR ❌",
    }
}

pub fn result_page(report: &QualityReport) -> String {
    layout(
        "Analysis Result",
        &format!(
            r#"<img src="/{image}" alt="analyzed fish">
<p class="verdict">{verdict}</p>
<table>
<tr><td>Species</td><td>{species}</td></tr>
<tr><td>Freshness</td><td>{freshness}</td></tr>
<tr><td>Count</td><td>{count}</td></tr>
<tr><td>Total weight</td><td>{weight} kg</td></tr>
<tr><td>Location</td><td>{lat}, {lon}</td></tr>
<tr><td>Time</td><td>{timestamp}</td></tr>
</table>
<p><a href="/">Analyze another fish</a></p>"#,
            image = escape_html(&report.image_reference),
            verdict = verdict_badge(report.quality_verdict),
            species = escape_html(&report.species),
            freshness = report.freshness,
            count = report.count,
            weight = report.total_weight,
            lat = report.latitude,
            lon = report.longitude,
            timestamp = escape_html(&report.timestamp),
        ),
    )
}
