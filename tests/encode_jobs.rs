//! Encode job pool against real decoded input

mod common;

use bookbinder::audio::AacFormat;
use bookbinder::config::Settings;
use bookbinder::encoder::EncoderKind;
use bookbinder::jobs::{binder_from_reports, EncodeJob, JobRunner, JobState};
use common::write_wav;

#[tokio::test]
async fn test_raw_jobs_concatenate_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("in");
    std::fs::create_dir_all(&input_dir).unwrap();
    let first = input_dir.join("a.wav");
    let second = input_dir.join("b.wav");
    let third = input_dir.join("c.wav");
    write_wav(&first, 2, 44100, 4410);
    write_wav(&second, 2, 44100, 2205);
    write_wav(&third, 1, 44100, 1000);

    let output_dir = dir.path().join("out");
    let mut jobs = vec![
        EncodeJob::new(2, "Second Part", vec![third.clone()], output_dir.clone()),
        EncodeJob::new(1, "First", vec![first.clone(), second.clone()], output_dir.clone()),
    ];
    for job in &mut jobs {
        job.format = AacFormat::new(2, 44100);
        job.rename_input = true;
    }

    let runner = JobRunner::new(&Settings::default(), EncoderKind::Raw);
    let reports = runner.run(jobs).await;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.state == JobState::Completed), "{reports:?}");
    assert_eq!(reports[0].position, 1);
    assert_eq!(reports[0].sample_count, 4410 + 2205);
    assert_eq!(reports[1].sample_count, 1000);

    let suffix = if cfg!(target_endian = "little") { "le" } else { "be" };
    let output = output_dir.join(format!("001_First.{}.2ch.s16.44100Hz.raw", suffix));
    assert_eq!(reports[0].output.as_deref(), Some(output.as_path()));
    assert_eq!(std::fs::metadata(&output).unwrap().len(), (4410 + 2205) * 4);
    assert!(output_dir.join(format!("002_Second_Part.{}.2ch.s16.44100Hz.raw", suffix)).exists());

    assert_eq!(
        reports[0].messages,
        vec![
            format!("+ {}", first.display()),
            format!("+ {}", second.display()),
            format!("= {}", output.display()),
        ]
    );
    assert!(!first.exists());
    assert!(input_dir.join("a.wav.done").exists());
    assert!(input_dir.join("c.wav.done").exists());

    let binder = binder_from_reports(&reports).unwrap();
    assert_eq!(binder.chapters[0].title, "First");
    assert_eq!(binder.chapters[1].sample_count, Some(1000));
}

#[tokio::test]
async fn test_failed_job_does_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.wav");
    write_wav(&good, 2, 44100, 1024);
    let wrong_rate = dir.path().join("wrong.wav");
    write_wav(&wrong_rate, 2, 22050, 1024);

    let out = dir.path().join("out");
    let jobs = vec![
        EncodeJob::new(1, "Good", vec![good], out.clone()),
        EncodeJob::new(2, "Wrong", vec![wrong_rate.clone()], out.clone()),
    ];
    let settings = Settings {
        num_threads: 1,
        ..Default::default()
    };
    let reports = JobRunner::new(&settings, EncoderKind::Raw).run(jobs).await;

    assert_eq!(reports[0].state, JobState::Completed);
    assert_eq!(reports[0].sample_count, 1024);
    assert_eq!(reports[1].state, JobState::Failed);
    assert!(reports[1].error.as_deref().unwrap().contains("22050"));
    assert!(wrong_rate.exists());

    let err = binder_from_reports(&reports).unwrap_err();
    assert!(err.to_string().contains("Chapter #2"));
}
