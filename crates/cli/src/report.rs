use serde_json::json;
use sorter_core::pipeline::PipelineSummary;
use sorter_core::scanner::Discovery;

pub fn summary_json(summary: &PipelineSummary) -> serde_json::Value {
    json!({
        "status": if summary.persist_failures == 0 { "ok" } else { "degraded" },
        "discovered": summary.discovered,
        "classified": summary.classified,
        "failed": summary.failed,
        "organized": summary.organized,
        "unsupported": summary.unsupported,
        "persist_failures": summary.persist_failures,
        "output_path": summary.output_path,
        "category_dir": summary.category_dir,
    })
}

pub fn summary_text(summary: &PipelineSummary) -> String {
    let mut out = format!(
        "classify: discovered {}, classified {}, failed {}, organized {}, unsupported {}\n\
         results saved to: {}\n\
         classified files saved to: {}",
        summary.discovered,
        summary.classified,
        summary.failed,
        summary.organized,
        summary.unsupported,
        summary.output_path.display(),
        summary.category_dir.display()
    );
    if summary.persist_failures > 0 {
        out.push_str(&format!(
            "\nwarning: {} result save(s) failed",
            summary.persist_failures
        ));
    }
    out
}

pub fn scan_json(discovery: &Discovery) -> serde_json::Value {
    json!({
        "supported": discovery.supported,
        "unsupported": discovery
            .unsupported
            .iter()
            .map(|u| json!({ "path": u.path, "reason": u.reason }))
            .collect::<Vec<_>>(),
    })
}

pub fn scan_text(discovery: &Discovery) -> String {
    let mut lines: Vec<String> = discovery
        .supported
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    lines.extend(
        discovery
            .unsupported
            .iter()
            .map(|u| format!("{} ({})", u.path.display(), u.reason)),
    );
    lines.push(format!(
        "scan: {} supported, {} unsupported",
        discovery.supported.len(),
        discovery.unsupported.len()
    ));
    lines.join("\n")
}
