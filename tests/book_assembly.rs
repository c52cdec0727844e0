//! End-to-end validation and assembly of synthetic books

mod common;

use bookbinder::audio::asc::{AudioSpecificConfig, AOT_AAC_LC};
use bookbinder::binder::{bind_book, validate_chapters, AssembleOptions, BookBinder, Chapter};
use bookbinder::error::BinderError;
use bookbinder::mp4::{read_artwork, ArtworkType, BookTags};
use common::*;

#[test]
fn test_encoder_padding_is_folded() {
    let dir = tempfile::tempdir().unwrap();
    let chapters = vec![
        Chapter::new("Opening", write_adts(dir.path(), "001_Opening.aac", FREQ_44100, 5)),
        Chapter::new("Closing", write_adts(dir.path(), "002_Closing.aac", FREQ_44100, 5))
            .with_sample_count(3 * 1024),
    ];
    let output = dir.path().join("book.m4b");
    let options = AssembleOptions {
        language: Some("eng".to_string()),
        ..Default::default()
    };

    let book = bind_book(&output, &chapters, &options).unwrap();
    assert_eq!(book.total_duration(), 8192);
    assert_eq!(book.chapters[1].padding_frames(), 2);

    let data = std::fs::read(&output).unwrap();
    assert_eq!(&data[4..8], b"ftyp");
    assert_eq!(&data[8..12], b"M4B ");
    assert!(find(&data, b"isommp42").is_some());

    let mvhd = find(&data, b"mvhd").unwrap();
    assert_eq!(read_u32(&data, mvhd + 16), 44100);
    assert_eq!(read_u32(&data, mvhd + 20), 8192);

    // audio track first: 5 + 3 samples, the last one packing three payloads
    let stsz = find(&data, b"stsz").unwrap();
    assert_eq!(read_u32(&data, stsz + 12), 8);
    let sizes: Vec<u32> = (0..8).map(|i| read_u32(&data, stsz + 16 + 4 * i)).collect();
    assert_eq!(sizes, vec![16, 17, 18, 19, 20, 16, 17, 18 + 19 + 20]);

    assert_eq!(count(&data, b"tkhd\x00\x00\x00\x0f"), 2);
    assert!(find(&data, b"chap\x00\x00\x00\x02").is_some());
    assert!(find(&data, b"Opening").is_some());
    assert!(find(&data, b"Closing").is_some());
    assert!(find(&data, &[0x05, 0x02, 0x12, 0x10]).is_some());
}

#[test]
fn test_sample_rate_change_rejected_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let chapters = vec![
        Chapter::new("One", write_adts(dir.path(), "001_One.aac", FREQ_44100, 5)),
        Chapter::new("Two", write_adts(dir.path(), "002_Two.aac", FREQ_22050, 5)),
    ];
    let output = dir.path().join("book.m4b");

    let err = bind_book(&output, &chapters, &AssembleOptions::default()).unwrap_err();
    assert!(matches!(err, BinderError::InconsistentConfig { chapter: 2, frame: 0, .. }));
    assert!(err.is_validation_error());
    assert!(!output.exists());
    assert!(!dir.path().join("book.m4b.part").exists());
}

#[test]
fn test_frame_count_skew_within_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    for skew in 1..=3usize {
        let chapters = vec![
            Chapter::new("One", write_adts(dir.path(), "001.aac", FREQ_44100, 4))
                .with_sample_count(4 * 1024),
            Chapter::new("Two", write_adts(dir.path(), "002.aac", FREQ_44100, 4 + skew))
                .with_sample_count(4 * 1024),
        ];
        let book = validate_chapters(&chapters, 3).unwrap();
        assert_eq!(book.chapters[1].frame_count, (4 + skew) as u64);
        assert_eq!(book.total_duration(), 8 * 1024);
    }

    let chapters = vec![Chapter::new("Two", write_adts(dir.path(), "003.aac", FREQ_44100, 8))
        .with_sample_count(4 * 1024)];
    assert!(matches!(
        validate_chapters(&chapters, 3).unwrap_err(),
        BinderError::FrameCountMismatch { actual: 8, expected: 4, .. }
    ));
    assert!(validate_chapters(&chapters, 4).is_ok());
}

#[test]
fn test_corrupt_chapter_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let corrupt = dir.path().join("002_Broken.aac");
    let mut bytes = adts_frame(FREQ_44100, 2, 32, 0);
    bytes[1] = 0x00;
    std::fs::write(&corrupt, bytes).unwrap();

    let chapters = vec![
        Chapter::new("One", write_adts(dir.path(), "001_One.aac", FREQ_44100, 2)),
        Chapter::new("Broken", corrupt),
    ];
    let err = validate_chapters(&chapters, 3).unwrap_err();
    match &err {
        BinderError::EmptyChapter { chapter, path } => {
            assert_eq!(*chapter, 2);
            assert!(path.ends_with("002_Broken.aac"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.chapter(), Some(2));
}

#[test]
fn test_detected_config() {
    let dir = tempfile::tempdir().unwrap();
    let chapters = vec![Chapter::new("One", write_adts(dir.path(), "001.aac", FREQ_44100, 1))];
    let book = validate_chapters(&chapters, 3).unwrap();

    let expected = AudioSpecificConfig::encode(AOT_AAC_LC, 2, 44100).unwrap();
    assert_eq!(book.config, expected);
    assert_eq!(book.config.value() >> 11, 0b00010);
    assert_eq!((book.config.value() >> 7) & 0xF, 0b0100);
    assert_eq!((book.config.value() >> 3) & 0xF, 0b0010);
    assert_eq!(book.config.to_string(), "AAC LC, 44100Hz, Stereo");
}

#[test]
fn test_binder_file_and_tags() {
    let dir = tempfile::tempdir().unwrap();
    write_adts(dir.path(), "001_One.aac", FREQ_44100, 3);
    write_adts(dir.path(), "002_Two.aac", FREQ_44100, 2);
    std::fs::write(dir.path().join("cover.png"), b"\x89PNG\r\n\x1a\nfake").unwrap();

    let binder_path = dir.path().join("binder.json");
    std::fs::write(
        &binder_path,
        r#"{"chapters": [
            {"title": "One", "file": "001_One.aac"},
            {"title": "", "file": "ignored.aac"},
            {"title": "Two", "file": "002_Two.aac", "sample_count": 2048}
        ]}"#,
    )
    .unwrap();
    let binder = BookBinder::load(&binder_path).unwrap();
    assert_eq!(binder.len(), 2);

    let tags_path = dir.path().join("tags.json");
    std::fs::write(
        &tags_path,
        r#"{"title": "The Book", "author": "A. Writer", "cover_image": "cover.png"}"#,
    )
    .unwrap();
    let tags = BookTags::load(&tags_path).unwrap();
    assert_eq!(tags.cover_image, Some(dir.path().join("cover.png")));

    let options = AssembleOptions {
        tags: Some(tags.clone()),
        ..Default::default()
    };
    let output = dir.path().join("book.m4b");
    bind_book(&output, &binder.chapters, &options).unwrap();

    let data = std::fs::read(&output).unwrap();
    let udta = find(&data, b"udta").unwrap();
    assert!(udta > find(&data, b"moov").unwrap());
    assert!(find(&data, b"\xA9alb").is_some());
    assert!(find(&data, b"The Book").is_some());
    assert!(find(&data, b"A. Writer").is_some());
    assert!(find(&data, b"covr").is_some());
    assert!(find(&data, b"\x89PNG").is_some());

    assert_eq!(BookTags::read_from(&output).unwrap(), BookTags { cover_image: None, ..tags });
    let (kind, cover) = read_artwork(&output).unwrap().unwrap();
    assert_eq!(kind, ArtworkType::Png);
    assert_eq!(cover, b"\x89PNG\r\n\x1a\nfake");
}
