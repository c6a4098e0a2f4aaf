// ============================================================================
// tests/shared_device.rs - デバイス層を通した共有バッファの統合テスト
// ============================================================================

use bufdev::config::{BUFFER_CAPACITY, DEVICE_NAME};
use bufdev::fs::DevFs;
use bufdev::{
    BufferModule, DevError, DevFileHandle, UserSlice, UserSliceMut, module_exit, module_init,
    open_session, release_session,
};

fn read_session(session: &DevFileHandle) -> Vec<u8> {
    let mut out = vec![0u8; BUFFER_CAPACITY];
    let n = session
        .read(&mut UserSliceMut::new(&mut out), BUFFER_CAPACITY)
        .unwrap();
    out.truncate(n);
    out
}

fn with_device(f: impl FnOnce(&DevFs)) {
    let fs = DevFs::new();
    let module = BufferModule::load(&fs).unwrap();
    f(&fs);
    module.unload(&fs).unwrap();
}

#[test]
fn write_hello_then_read() {
    with_device(|fs| {
        let session = DevFileHandle::open_in(fs, DEVICE_NAME).unwrap();
        assert_eq!(session.write(&UserSlice::new(b"hello")).unwrap(), 5);

        let mut out = [0u8; 100];
        let n = session.read(&mut UserSliceMut::new(&mut out), 100).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&out[..n], b"hello");
    });
}

#[test]
fn oversize_write_keeps_first_capacity_bytes() {
    with_device(|fs| {
        let session = DevFileHandle::open_in(fs, DEVICE_NAME).unwrap();
        let input = vec![b'x'; BUFFER_CAPACITY + 10];
        assert_eq!(session.write(&UserSlice::new(&input)).unwrap(), BUFFER_CAPACITY);

        let data = read_session(&session);
        assert_eq!(data.len(), BUFFER_CAPACITY);
        assert!(data.iter().all(|&b| b == b'x'));
    });
}

#[test]
fn empty_write_replaces_previous_payload() {
    with_device(|fs| {
        let session = DevFileHandle::open_in(fs, DEVICE_NAME).unwrap();
        session.write(&UserSlice::new(b"abc")).unwrap();
        assert_eq!(session.write(&UserSlice::new(b"")).unwrap(), 0);
        assert!(read_session(&session).is_empty());
    });
}

#[test]
fn session_opened_before_write_sees_it() {
    with_device(|fs| {
        let early = DevFileHandle::open_in(fs, DEVICE_NAME).unwrap();
        let writer = DevFileHandle::open_in(fs, DEVICE_NAME).unwrap();
        writer.write(&UserSlice::new(b"late news")).unwrap();
        assert_eq!(read_session(&early), b"late news");
    });
}

#[test]
fn short_destination_faults_without_count() {
    with_device(|fs| {
        let session = DevFileHandle::open_in(fs, DEVICE_NAME).unwrap();
        session.write(&UserSlice::new(b"hello")).unwrap();

        let mut out = [0u8; 3];
        let result = session.read(&mut UserSliceMut::new(&mut out), 3);
        if cfg!(feature = "clamp_reads") {
            assert_eq!(result, Ok(3));
        } else {
            assert_eq!(result, Err(DevError::TransferFault));
            assert_eq!(DevError::TransferFault.errno(), -14);
        }
    });
}

#[test]
fn global_module_lifecycle() {
    assert!(matches!(open_session(), Err(DevError::NotLoaded)));
    assert_eq!(module_exit(), Err(DevError::NotLoaded));

    module_init().unwrap();
    assert_eq!(module_init(), Err(DevError::AlreadyLoaded));

    let first = open_session().unwrap();
    let second = open_session().unwrap();
    assert_eq!(first.write(&UserSlice::new(b"foo")).unwrap(), 3);
    assert_eq!(read_session(&second), b"foo");

    release_session(first);
    release_session(second);
    module_exit().unwrap();
    assert!(matches!(open_session(), Err(DevError::NotLoaded)));
}
