mod common;

use std::path::Path;

use common::{FakeBrowser, to_html};
use mdocx::Config;

async fn recover(markdown: &str, browser: &FakeBrowser) -> String {
    let elements =
        mdocx::markdown_to_elements(markdown, Path::new("."), &Config::default(), browser.launcher())
            .await;
    mdocx::markdown_from_html(&to_html(&elements))
}

#[tokio::test]
async fn rendered_mermaid_comes_back_as_fence() {
    let browser = FakeBrowser::rendering();
    let recovered = recover("```mermaid\ngraph TD; A-->B;\n```", &browser).await;

    assert_eq!(recovered, "```mermaid\ngraph TD; A-->B;\n```\n");
}

#[tokio::test]
async fn unrendered_diagram_comes_back_unlabelled() {
    let browser = FakeBrowser::failing_launch();
    let recovered = recover("```mermaid\ngraph TD; A-->B;\n```", &browser).await;

    assert_eq!(recovered, "```\ngraph TD; A-->B;\n```\n");
}

#[tokio::test]
async fn plantuml_source_survives_html_special_characters() {
    let browser = FakeBrowser::rendering();
    let source = "@startuml\nAlice -> Bob : \"<hello & bye>\"\n@enduml";
    let recovered = recover(&format!("```plantuml\n{source}\n```"), &browser).await;

    assert_eq!(recovered, format!("```plantuml\n{source}\n```\n"));
}

#[tokio::test]
async fn mixed_document_round_trip() {
    let browser = FakeBrowser::rendering();
    let markdown = "# Title\n\n\
                    Some **bold** and [a link](https://example.com).\n\n\
                    - one\n- two\n\n\
                    | A | B |\n| --- | --- |\n| 1 | 2 |\n\n\
                    ```mermaid\ngraph TD; A-->B;\n```\n\n\
                    ---\n\n\
                    ```mermaid\nsequenceDiagram\n    A->>B: hi\n```";
    let recovered = recover(markdown, &browser).await;

    let expected_parts = [
        "# Title",
        "Some **bold** and [a link](https://example.com).",
        "- one\n\n- two",
        "| A | B |\n| --- | --- |\n| 1 | 2 |",
        "```mermaid\ngraph TD; A-->B;\n```",
        "---",
        "```mermaid\nsequenceDiagram\n    A->>B: hi\n```",
    ];
    let mut from = 0;
    for part in expected_parts {
        let found = recovered[from..]
            .find(part)
            .unwrap_or_else(|| panic!("missing {part:?} after offset {from} in:\n{recovered}"));
        from += found + part.len();
    }
    assert_eq!(recovered.matches("```mermaid").count(), 2);
}
