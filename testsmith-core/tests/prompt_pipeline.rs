use testsmith_core::config::PromptConfig;
use testsmith_core::contract::{FileContent, MockTextGenerator};
use testsmith_core::error::{GenerationError, PipelineError};
use testsmith_core::prompt::{generate_code, summarize};

fn files() -> Vec<FileContent> {
    vec![FileContent {
        blob_id: "abc123".to_string(),
        source_url: "https://api.github.com/repos/acme/widgets/git/blobs/abc123".to_string(),
        text: "export function add(a, b) { return a + b; }\n".to_string(),
    }]
}

#[tokio::test]
async fn test_summarize_returns_items_in_service_order() {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_generate()
        .withf(|prompt| prompt.contains("export function add") && prompt.contains("numbered list"))
        .times(1)
        .returning(|_| {
            Ok("1. Adds two positive numbers.\n\n2. Adds negative numbers.\n3. Handles non-numeric input.\n".to_string())
        });

    let summaries = summarize(&generator, &files()).await.expect("summaries");
    assert_eq!(
        summaries,
        vec![
            "1. Adds two positive numbers.",
            "2. Adds negative numbers.",
            "3. Handles non-numeric input.",
        ]
    );
}

#[tokio::test]
async fn test_summarize_surfaces_service_failure() {
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().times(1).returning(|_| {
        Err(GenerationError::Status {
            status: 429,
            body: "quota".to_string(),
        })
    });

    let err = summarize(&generator, &files()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Generation(GenerationError::Status { status: 429, .. })));
}

#[tokio::test]
async fn test_summarize_rejects_formatting_only_output() {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_generate()
        .returning(|_| Ok("```markdown\n\n```".to_string()));

    let err = summarize(&generator, &files()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Generation(GenerationError::Malformed(_))));
}

#[tokio::test]
async fn test_summarize_accepts_unnumbered_lines() {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok("Logs the value.\nHandles an undefined argument.\n".to_string()));

    let summaries = summarize(&generator, &files()).await.expect("summaries");
    assert_eq!(summaries, vec!["Logs the value.", "Handles an undefined argument."]);
}

#[tokio::test]
async fn test_generate_code_pins_framework_and_strips_fences() {
    let mut generator = MockTextGenerator::new();
    generator
        .expect_generate()
        .withf(|prompt| {
            prompt.contains("using the Vitest framework")
                && prompt.contains("\"2. Adds negative numbers.\"")
        })
        .times(1)
        .returning(|_| {
            Ok("```javascript\nimport { add } from './add';\ntest('neg', () => expect(add(-1, -2)).toBe(-3));\n```".to_string())
        });

    let config = PromptConfig {
        framework: "Vitest".to_string(),
    };
    let artifact = generate_code(&generator, &config, &files(), "2. Adds negative numbers.")
        .await
        .expect("code");

    assert_eq!(artifact.summary, "2. Adds negative numbers.");
    assert_eq!(
        artifact.code,
        "import { add } from './add';\ntest('neg', () => expect(add(-1, -2)).toBe(-3));"
    );
}

#[tokio::test]
async fn test_generate_code_rejects_empty_output() {
    let mut generator = MockTextGenerator::new();
    generator.expect_generate().returning(|_| Ok("   \n".to_string()));

    let err = generate_code(&generator, &PromptConfig::default(), &files(), "1. x")
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Generation(GenerationError::Empty)));
}
