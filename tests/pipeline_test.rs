use fontprint::classifier::{classify, MONO_LIKE, SANS_LIKE, SERIF_LIKE};
use fontprint::config::{ClassifierConfig, FontPrintConfig, NormalizationConfig, SimilarityConfig};
use fontprint::corpus::nearest_matches;
use fontprint::layout::{PageMarginsTwips, RecognizedPage, StructuredPage};
use fontprint::{
    compare, Delta, FingerprintRepository, FontPrint, FontPrinter, GlyphBox, JsonFileRepository,
    LayoutInput, LayoutWarning, MemoryRepository, SourceKind, Surface,
};
use tempfile::tempdir;

/// Three lines of ten single-glyph boxes, 14px tall, aspect just under 1
fn glyph_page(glyph_width: f64) -> LayoutInput {
    let mut boxes = Vec::new();
    for row in 0..3 {
        for col in 0..10 {
            let x0 = 100.0 + col as f64 * 20.0;
            let y0 = 100.0 + row as f64 * 40.0;
            boxes.push(GlyphBox::new(x0, y0, x0 + glyph_width, y0 + 14.0, "o"));
        }
    }
    LayoutInput::Recognized(RecognizedPage {
        boxes,
        surface: Surface::new(1000.0, 1400.0),
    })
}

fn page_with_jitter(jitter: f64) -> LayoutInput {
    let mut boxes = Vec::new();
    for line in 0..10 {
        let top = 100.0 + line as f64 * 40.0 + jitter;
        boxes.push(GlyphBox::new(150.0 + jitter, top, 600.0, top + 24.0, "serif text"));
        boxes.push(GlyphBox::new(610.0, top + jitter, 1050.0 - jitter, top + 24.0, "more text"));
    }
    LayoutInput::Recognized(RecognizedPage {
        boxes,
        surface: Surface::new(1200.0, 1600.0),
    })
}

#[test]
fn test_end_to_end_vectors() {
    let serif = classify(0.8, &ClassifierConfig::default());
    let a = FontPrint::from_vector(SourceKind::Recognized, vec![14.0, 6.0, 30.0, 30.0, 25.0, 25.0], serif.clone(), &NormalizationConfig::default()).unwrap();
    let b = FontPrint::from_vector(SourceKind::Recognized, vec![14.0, 6.0, 30.0, 30.0, 25.0, 25.0], serif.clone(), &NormalizationConfig::default()).unwrap();
    let c = FontPrint::from_vector(SourceKind::Recognized, vec![10.0, 5.0, 20.0, 20.0, 20.0, 20.0], serif.clone(), &NormalizationConfig::default()).unwrap();
    let zero = FontPrint::from_vector(SourceKind::Recognized, vec![0.0; 6], vec![], &NormalizationConfig::default()).unwrap();

    let config = SimilarityConfig::default();
    let same = compare(&a, &b, &config);
    assert_eq!(format!("{:.3}", same.similarity), "1.000");
    assert!(a.same_layout(&b));

    let near = compare(&a, &c, &config);
    assert!(near.similarity > 0.0 && near.similarity < 1.0);
    assert_eq!(near.similarity, compare(&c, &a, &config).similarity);

    let empty = compare(&a, &zero, &config);
    assert_eq!(empty.similarity, 0.0);
    assert!(empty.font_overlap.is_empty());
    assert_eq!(empty.font_size_delta, Delta::Unavailable);
}

#[test]
fn test_rescanned_page_converges() {
    let printer = FontPrinter::default();
    let first = printer.fingerprint(&page_with_jitter(0.0)).unwrap();
    let second = printer.fingerprint(&page_with_jitter(0.02)).unwrap();

    assert_eq!(first.vector, second.vector);
    assert_eq!(first.fingerprint_hash, second.fingerprint_hash);
    assert_eq!(first.vector, vec![24.0, 40.0, 150.0, 150.0, 100.0, 1600.0 - 484.0]);
    assert_eq!(first.features.font_candidates[0].name, SANS_LIKE);
}

#[test]
fn test_rescanned_glyphs_keep_identity() {
    let printer = FontPrinter::default();
    let first = printer.fingerprint(&glyph_page(14.4)).unwrap();
    let second = printer.fingerprint(&glyph_page(14.41)).unwrap();

    // the measured aspect moved, the quantized identity did not
    assert_ne!(first.extras["aspect"], second.extras["aspect"]);
    assert_eq!(first.vector, vec![14.0, 40.0, 100.0, 705.6, 100.0, 1206.0]);
    assert_eq!(first.vector, second.vector);
    assert_eq!(first.features.font_candidates, second.features.font_candidates);
    assert_eq!(first.fingerprint_hash, second.fingerprint_hash);

    let names: Vec<&str> = first.features.font_candidates.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec![SERIF_LIKE, SANS_LIKE, MONO_LIKE]);

    let mut repository = MemoryRepository::default();
    assert!(repository.append(first).unwrap());
    assert!(!repository.append(second).unwrap());
    assert_eq!(repository.list().unwrap().len(), 1);
}

#[test]
fn test_structured_against_recognized_is_padded() {
    let printer = FontPrinter::default();
    let recognized = printer.fingerprint(&page_with_jitter(0.0)).unwrap();
    let structured = printer
        .fingerprint(&LayoutInput::Structured(StructuredPage {
            margins_twips: Some(PageMarginsTwips {
                left: 1440.0,
                right: 1440.0,
                top: 1440.0,
                bottom: 1440.0,
            }),
            font_sizes_half_points: vec![24.0],
            declared_font: None,
        }))
        .unwrap();

    assert_eq!(structured.vector, vec![12.0, 25.4, 25.4, 25.4, 25.4]);
    let result = compare(&recognized, &structured, &SimilarityConfig::default());
    assert!(result.similarity > 0.0 && result.similarity <= 1.0);
    assert_eq!(result.line_gap_delta, Delta::Unavailable);
    assert_eq!(result.font_size_delta, Delta::Value(8.0));
    assert_eq!(
        result.warnings,
        vec![LayoutWarning::DimensionMismatch { left: 6, right: 5 }]
    );
}

#[test]
fn test_config_constants_flow_through() {
    let mut config = FontPrintConfig::default();
    config.classifier.mono_score = 0.97;
    let print = FontPrinter::new(config).fingerprint(&page_with_jitter(0.0)).unwrap();
    assert_eq!(print.features.font_candidates[0].name, MONO_LIKE);

    let default_print = FontPrinter::default().fingerprint(&page_with_jitter(0.0)).unwrap();
    assert_ne!(print.fingerprint_hash, default_print.fingerprint_hash);
}

#[test]
fn test_corpus_round_trip_and_search() {
    let temp_dir = tempdir().unwrap();
    let corpus_path = temp_dir.path().join("corpus.json");
    let mut repository = JsonFileRepository::new(&corpus_path);
    let printer = FontPrinter::default();

    let stored = printer.fingerprint_into(&page_with_jitter(0.0), &mut repository).unwrap();
    // same layout again: deduplicated by hash
    printer.fingerprint_into(&page_with_jitter(0.01), &mut repository).unwrap();
    let serif = FontPrint::from_vector(
        SourceKind::Recognized,
        vec![11.0, 16.0, 90.0, 90.0, 70.0, 70.0],
        classify(0.7, &ClassifierConfig::default()),
        &NormalizationConfig::default(),
    )
    .unwrap();
    repository.append(serif.clone()).unwrap();

    let corpus = repository.list().unwrap();
    assert_eq!(corpus.len(), 2);

    let probe = printer.fingerprint(&page_with_jitter(0.03)).unwrap();
    let matches = nearest_matches(&probe, &corpus, 5, &SimilarityConfig::default());
    assert_eq!(matches[0].fingerprint_hash, stored.fingerprint_hash);
    assert!((matches[0].comparison.similarity - 1.0).abs() < 1e-9);
    assert_eq!(matches[1].id, serif.id);
    assert!(matches[1].comparison.font_overlap.contains(&SERIF_LIKE.to_string()));
}
