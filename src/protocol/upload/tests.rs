//! Unit tests for upload record parsing and assembly.
use super::*;
use crate::error::UploadError;

fn file_record(size: u32, name: &[u8], out: &mut [u8]) -> usize {
    out[0] = UPLOAD_TYPE_FILE;
    out[1..4].copy_from_slice(&size.to_be_bytes()[1..]);
    out[4..4 + name.len()].copy_from_slice(name);
    4 + name.len()
}

fn data_record(offset: u32, data: &[u8], out: &mut [u8]) -> usize {
    out[0] = UPLOAD_TYPE_DATA;
    out[1..4].copy_from_slice(&offset.to_be_bytes()[1..]);
    out[4..4 + data.len()].copy_from_slice(data);
    4 + data.len()
}

fn end_record(size: u32, c0: u8, c1: u8, out: &mut [u8]) -> usize {
    out[0] = UPLOAD_TYPE_END;
    out[1..4].copy_from_slice(&size.to_be_bytes()[1..]);
    out[4] = c0;
    out[5] = c1;
    6
}

#[test]
fn test_record_parse() {
    let mut wire = [0u8; 32];
    let len = file_record(16, b"afile", &mut wire);
    assert_eq!(
        UploadRecord::parse(&wire[..len]),
        Ok(UploadRecord::File {
            size: 16,
            name: b"afile"
        })
    );

    assert_eq!(
        UploadRecord::parse(&[0x04, 0, 0, 0]),
        Err(UploadError::RecordType { record_type: 4 })
    );
    assert_eq!(UploadRecord::parse(&[0x01]), Err(UploadError::Truncated));
}

#[test]
fn test_end_record_without_checksum_pair() {
    assert_eq!(
        UploadRecord::parse(&[0x03, 0x00, 0x00, 0x10]),
        Ok(UploadRecord::End {
            size: 16,
            c0: 0,
            c1: 0
        })
    );
}

#[test]
fn test_upload_accepts_valid_fletcher() {
    // Sixteen bytes of payload in one data record, then EOD with the
    // matching Fletcher pair.
    let image: [u8; 16] = core::array::from_fn(|i| i as u8);
    let mut cksum = crate::infra::codec::checksum::Fletcher16::new();
    cksum.update(&image);
    let (c0, c1) = cksum.finish();

    let mut buffer = [0u8; 64];
    let mut session = UploadSession::new(&mut buffer);

    let mut wire = [0u8; 32];
    let len = file_record(16, b"afile", &mut wire);
    let status = session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();
    assert_eq!(status, UploadStatus::Started { size: 16 });
    assert!(session.is_active());
    assert_eq!(session.file_name(), b"afile");

    let len = data_record(0, &image, &mut wire);
    let status = session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();
    assert_eq!(status, UploadStatus::InProgress { received: 16 });

    let len = end_record(16, c0, c1, &mut wire);
    let status = session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();
    assert_eq!(status, UploadStatus::Complete { size: 16 });
    assert!(!session.is_active());
    assert_eq!(session.image(), Some(&image[..]));
}

#[test]
fn test_upload_rejects_wrong_fletcher() {
    let image = [0x55u8; 16];
    let mut buffer = [0u8; 64];
    let mut session = UploadSession::new(&mut buffer);

    let mut wire = [0u8; 32];
    let len = file_record(16, b"afile", &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();
    let len = data_record(0, &image, &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();

    let len = end_record(16, 0xDE, 0xAD, &mut wire);
    assert_eq!(
        session.process(&UploadRecord::parse(&wire[..len]).unwrap()),
        Err(UploadError::ChecksumFailed)
    );
    // Failure cancels the whole transfer.
    assert!(!session.is_active());
    assert_eq!(session.image(), None);
}

#[test]
fn test_upload_offset_checks() {
    let mut buffer = [0u8; 64];
    let mut session = UploadSession::new(&mut buffer);
    let mut wire = [0u8; 32];

    let len = file_record(16, b"afile", &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();
    let len = data_record(0, &[0u8; 8], &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();

    // Gap: next record must start at offset 8.
    let len = data_record(12, &[0u8; 4], &mut wire);
    assert_eq!(
        session.process(&UploadRecord::parse(&wire[..len]).unwrap()),
        Err(UploadError::OffsetGap { offset: 12 })
    );
}

#[test]
fn test_upload_overlap_and_overflow() {
    let mut buffer = [0u8; 64];
    let mut session = UploadSession::new(&mut buffer);
    let mut wire = [0u8; 64];

    let len = file_record(16, b"afile", &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();
    let len = data_record(0, &[0u8; 8], &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();

    let len = data_record(4, &[0u8; 4], &mut wire);
    assert_eq!(
        session.process(&UploadRecord::parse(&wire[..len]).unwrap()),
        Err(UploadError::OffsetOverlap { offset: 4 })
    );

    // Cancelled by the failure above; restart and overflow.
    let len = file_record(16, b"afile", &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();
    let len = data_record(0, &[0u8; 32], &mut wire);
    assert_eq!(
        session.process(&UploadRecord::parse(&wire[..len]).unwrap()),
        Err(UploadError::OffsetOverflow { offset: 0 })
    );
}

#[test]
fn test_upload_rejects_oversized_file() {
    let mut buffer = [0u8; 8];
    let mut session = UploadSession::new(&mut buffer);
    let mut wire = [0u8; 32];
    let len = file_record(1024, b"big", &mut wire);
    assert_eq!(
        session.process(&UploadRecord::parse(&wire[..len]).unwrap()),
        Err(UploadError::Length { size: 1024 })
    );
}

#[test]
fn test_data_absorbed_when_idle() {
    let mut buffer = [0u8; 8];
    let mut session = UploadSession::new(&mut buffer);
    let mut wire = [0u8; 32];
    let len = data_record(0, &[1, 2, 3], &mut wire);
    assert_eq!(
        session.process(&UploadRecord::parse(&wire[..len]).unwrap()),
        Ok(UploadStatus::Ignored)
    );
    let len = end_record(3, 0, 0, &mut wire);
    assert_eq!(
        session.process(&UploadRecord::parse(&wire[..len]).unwrap()),
        Ok(UploadStatus::Ignored)
    );
}

#[test]
fn test_rejection_subcodes() {
    use crate::protocol::cmderrs;

    let cases = [
        (
            UploadError::RecordType { record_type: 4 },
            cmderrs::ERROR_UPLOAD_TYPE,
        ),
        (UploadError::Truncated, cmderrs::ERROR_UPLOAD_TYPE),
        (UploadError::Length { size: 9 }, cmderrs::ERROR_UPLOAD_LENGTH),
        (UploadError::FileName, cmderrs::ERROR_UPLOAD_FILE_NAME),
        (
            UploadError::OffsetOverlap { offset: 4 },
            cmderrs::ERROR_UPLOAD_OFFSET_OVERLAP,
        ),
        (
            UploadError::OffsetGap { offset: 12 },
            cmderrs::ERROR_UPLOAD_OFFSET_GAP,
        ),
        (
            UploadError::OffsetOverflow { offset: 0 },
            cmderrs::ERROR_UPLOAD_OFFSET_OVERFLOW,
        ),
        (UploadError::ChecksumFailed, cmderrs::ERROR_UPLOAD_CHECKSUM),
    ];
    for (err, subcode) in cases {
        assert_eq!(err.subcode(), subcode, "{err:?}");
    }
}

#[test]
fn test_rejected_packet_produces_error_report() {
    use crate::protocol::cmderrs;
    use crate::protocol::packet::Packet;

    let mut buffer = [0u8; 8];
    let mut session = UploadSession::new(&mut buffer);

    // Unknown record type 0x04 inside a file-upload packet.
    let packet = Packet::from_parts(0xE0, 0xC0, &[0x04, 0x00, 0x00, 0x01]);
    let err = session.process_packet(&packet).unwrap_err();
    assert_eq!(err, UploadError::RecordType { record_type: 4 });
    assert!(!session.is_active());

    let report = error_report(&err);
    assert_eq!(report.header, 0xE0);
    assert_eq!(report.packet_type, 0xE0);
    assert_eq!(
        report.payload(),
        &cmderrs::ERROR_UPLOAD_TYPE.to_be_bytes()
    );
    assert_eq!(report.format.as_bytes(), b"%2x");
}

#[test]
fn test_end_length_mismatch() {
    let mut buffer = [0u8; 64];
    let mut session = UploadSession::new(&mut buffer);
    let mut wire = [0u8; 32];

    let len = file_record(8, b"afile", &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();
    let len = data_record(0, &[0u8; 8], &mut wire);
    session
        .process(&UploadRecord::parse(&wire[..len]).unwrap())
        .unwrap();

    let len = end_record(9, 0, 0, &mut wire);
    assert_eq!(
        session.process(&UploadRecord::parse(&wire[..len]).unwrap()),
        Err(UploadError::Length { size: 9 })
    );
}
