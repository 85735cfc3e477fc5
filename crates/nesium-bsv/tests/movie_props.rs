mod common;

use std::io::Cursor;

use common::FakeHost;
use nesium_bsv::{DEFAULT_RING_CAPACITY, MovieSession, SessionOptions};
use proptest::prelude::*;

const CAPACITY: usize = 8;
const SMALL: SessionOptions = SessionOptions {
    ring_capacity: CAPACITY,
};

const CRC: u32 = 0x0BAD_F00D;

type Session = MovieSession<Cursor<Vec<u8>>>;

fn frames_strategy(max_frames: usize) -> impl Strategy<Value = Vec<Vec<i16>>> {
    prop::collection::vec(prop::collection::vec(any::<i16>(), 0..4), 0..max_frames)
}

fn record_frame(session: &mut Session, samples: &[i16]) {
    session.mark_frame_start().unwrap();
    for &s in samples {
        session.write_sample(s).unwrap();
    }
    session.advance_frame().unwrap();
}

fn play_frame(session: &mut Session, len: usize) -> Vec<i16> {
    session.mark_frame_start().unwrap();
    let samples = (0..len).map(|_| session.read_sample().unwrap()).collect();
    session.advance_frame().unwrap();
    samples
}

fn record(host: &mut FakeHost, frames: &[Vec<i16>]) -> Session {
    let mut session = Session::record(Cursor::new(Vec::new()), host, CRC, SMALL).unwrap();
    for frame in frames {
        record_frame(&mut session, frame);
    }
    session
}

fn reopen(session: Session, host: &mut FakeHost) -> Session {
    let bytes = session.into_stream().into_inner();
    Session::playback(Cursor::new(bytes), host, CRC, SMALL).unwrap()
}

proptest! {
    #[test]
    fn playback_reproduces_recorded_frames(
        frames in frames_strategy(5 * CAPACITY),
        state in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let mut host = FakeHost::new(&state, CRC);
        let session = record(&mut host, &frames);
        let mut session = reopen(session, &mut host);

        prop_assert!(session.warnings().is_empty());
        for frame in &frames {
            prop_assert_eq!(&play_frame(&mut session, frame.len()), frame);
        }
        prop_assert!(session.read_sample().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn rewind_then_record_keeps_earlier_frames(
        frames in frames_strategy(5 * CAPACITY).prop_filter("needs a frame", |f| !f.is_empty()),
        tail in frames_strategy(6),
    ) {
        let mut host = FakeHost::new(&[0x11, 0x22], CRC);
        let mut session = record(&mut host, &frames);
        session.rewind(&mut host).unwrap();
        for frame in &tail {
            record_frame(&mut session, frame);
        }

        let kept = &frames[..frames.len() - 1];
        let mut session = reopen(session, &mut host);
        for frame in kept.iter().chain(&tail) {
            prop_assert_eq!(&play_frame(&mut session, frame.len()), frame);
        }
    }

    #[test]
    fn playback_rewind_never_crosses_first_sample(
        frames in frames_strategy(3 * CAPACITY),
        rewinds in 1usize..(4 * CAPACITY),
    ) {
        let mut host = FakeHost::new(&[5; 3], CRC);
        let session = record(&mut host, &frames);
        let mut session = reopen(session, &mut host);
        let floor = session.min_file_position();

        for frame in &frames {
            play_frame(&mut session, frame.len());
        }
        for _ in 0..rewinds {
            session.rewind(&mut host).unwrap();
            prop_assert!(session.position().unwrap() >= floor);
        }
    }
}

#[test]
fn rewind_depth_is_bounded_by_ring_capacity() {
    let capacity = DEFAULT_RING_CAPACITY;
    let options = SessionOptions::default();
    let mut host = FakeHost::new(&[1, 2, 3, 4], CRC);
    let mut session = Session::record(Cursor::new(Vec::new()), &mut host, CRC, options).unwrap();
    let floor = session.min_file_position();

    for f in 0..capacity + 100 {
        record_frame(&mut session, &[f as i16]);
    }
    assert_eq!(session.ring().write_pointer(), 100);
    assert_eq!(session.ring().depth(), capacity);

    // Without frames in between every rewind undoes a single frame.
    for _ in 0..capacity {
        session.rewind(&mut host).unwrap();
    }
    // Oldest frame still addressable: frame 100.
    let oldest = floor + 2 * 100;
    assert_eq!(session.position().unwrap(), oldest);
    assert_eq!(session.ring().depth(), 0);

    session.rewind(&mut host).unwrap();
    assert_eq!(session.position().unwrap(), oldest);
}
