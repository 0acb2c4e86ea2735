use origo_lib::services::segmenter::{Document, TextSegmenter};
use origo_lib::services::text_processor::preview;
use serde::Serialize;
use std::io::Read;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SentenceOut {
    paragraph_index: usize,
    sentence_index: usize,
    start: usize,
    end: usize,
    tokens: usize,
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParagraphOut {
    index: usize,
    start: usize,
    end: usize,
    sentences: usize,
    tokens: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Output {
    file: String,
    chars: usize,
    tokens: usize,
    paragraphs: Vec<ParagraphOut>,
    sentences: Vec<SentenceOut>,
}

fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("read stdin failed: {}", e))?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| format!("read file failed: {}", e))
}

fn build_output(file: &str, doc: &Document) -> Output {
    let paragraphs = doc
        .paragraphs()
        .iter()
        .map(|p| {
            let (start, end) = doc.char_span(p.span);
            ParagraphOut {
                index: p.index,
                start,
                end,
                sentences: p.sentences.len(),
                tokens: p.token_count(),
            }
        })
        .collect();
    let sentences = doc
        .sentences()
        .map(|s| {
            let (start, end) = doc.char_span(s.span);
            SentenceOut {
                paragraph_index: s.paragraph_index,
                sentence_index: s.index,
                start,
                end,
                tokens: s.token_count(),
                text: doc.slice(s.span).to_string(),
            }
        })
        .collect();
    Output {
        file: file.to_string(),
        chars: doc.char_len(),
        tokens: doc.token_count(),
        paragraphs,
        sentences,
    }
}

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!(
            "Usage:\n  cargo run --bin segment_text -- <path.txt|-> [--sentences <n>] [--min-chars <n>] [--out <json_path>]"
        );
        return Ok(());
    }

    let path = args[1].clone();
    let sentences_n: usize = parse_arg_value(&args, "--sentences")
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);
    let min_chars: usize = parse_arg_value(&args, "--min-chars")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let out_path = parse_arg_value(&args, "--out");

    let text = read_input(&path)?;
    let doc = TextSegmenter::new(min_chars)
        .segment(&text)
        .map_err(|e| e.to_string())?;
    let out = build_output(&path, &doc);

    println!("File: {}", path);
    println!("Text: {} chars ({} bytes), {} tokens", out.chars, text.len(), out.tokens);
    println!();

    println!("Paragraphs: {}", out.paragraphs.len());
    for p in &out.paragraphs {
        println!(
            "[P{:03}] chars=[{},{}] sentences={} tokens={}",
            p.index, p.start, p.end, p.sentences, p.tokens
        );
    }
    println!();

    println!("Sentences: {}", out.sentences.len());
    for (i, s) in out.sentences.iter().take(sentences_n).enumerate() {
        println!(
            "[S{:04}] p{}.{} chars=[{},{}] tokens={}  {}",
            i,
            s.paragraph_index,
            s.sentence_index,
            s.start,
            s.end,
            s.tokens,
            preview(&s.text, 120).replace('\n', " ")
        );
    }
    if out.sentences.len() > sentences_n {
        println!("... ({} more sentences)", out.sentences.len() - sentences_n);
    }

    if let Some(out_path) = out_path {
        let json = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
        std::fs::write(&out_path, json).map_err(|e| format!("write out failed: {}", e))?;
        println!();
        println!("Wrote JSON: {}", out_path);
    }

    Ok(())
}
