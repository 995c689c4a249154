//! Concat command implementation

use anyhow::{Context, Result};

use crate::{commands::read_payload, utils::write_file};

pub fn run(files: Vec<String>, output: String) -> Result<()> {
    let mut files = files.iter();
    let Some(first) = files.next() else {
        anyhow::bail!("No payload files to concatenate");
    };
    let mut payload = read_payload(first)?;
    for path in files {
        let tail = read_payload(path)?;
        payload
            .append(&tail.view())
            .with_context(|| format!("Cannot append {}", path))?;
    }
    println!(
        "Concatenated {} cells into {} segments",
        payload.len(),
        payload.segment_count()
    );
    write_file(&output, &payload.to_bytes())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tessel_rle::{ElementKind, Payload, PayloadBuilder, Value};

    use super::*;

    fn write_strings(path: &Path, values: &[&str]) {
        let mut builder = PayloadBuilder::new(ElementKind::Variable);
        for v in values {
            builder.push(Value::from(*v).as_ref()).unwrap();
        }
        std::fs::write(path, builder.finish().to_bytes()).unwrap();
    }

    #[test]
    fn test_concat_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let out = dir.path().join("out.bin");
        write_strings(&a, &["x", "y"]);
        write_strings(&b, &["y", "z", "z"]);

        run(
            vec![
                a.to_str().unwrap().to_string(),
                b.to_str().unwrap().to_string(),
            ],
            out.to_str().unwrap().to_string(),
        )
        .unwrap();

        let payload = read_payload(out.to_str().unwrap()).unwrap();
        let expected: Vec<Value> = ["x", "y", "y", "z", "z"].map(Value::from).to_vec();
        assert_eq!(payload.to_values(), expected);
    }

    #[test]
    fn test_concat_mismatched_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        write_strings(&a, &["x"]);
        std::fs::write(&b, Payload::empty(ElementKind::Boolean).to_bytes()).unwrap();

        let result = run(
            vec![
                a.to_str().unwrap().to_string(),
                b.to_str().unwrap().to_string(),
            ],
            dir.path().join("out.bin").to_str().unwrap().to_string(),
        );
        assert!(result.is_err());
    }
}
