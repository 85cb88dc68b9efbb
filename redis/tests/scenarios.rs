//! end-to-end scenarios driven against a scripted loopback TCP fake server (no real
//! redis-compatible server process required).

use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

use xitca_redis::{Arg, Config, Connection, ExecuteOptions, Value};

/// accept exactly one connection and, for each script entry, read one inbound write and
/// answer with that entry's canned reply bytes.
async fn fake_server(listener: TcpListener, script: Vec<&'static [u8]>) {
    let (mut sock, _) = listener.accept().await.unwrap();
    let mut buf = vec![0u8; 65536];
    for reply in script {
        let n = sock.read(&mut buf).await.unwrap();
        assert!(n > 0, "client closed the connection before the script was exhausted");
        sock.write_all(reply).await.unwrap();
    }
}

async fn connect_with_script(script: Vec<&'static [u8]>) -> Connection {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(fake_server(listener, script));

    let host = addr.ip().to_string();
    let cfg = Config::try_from((host.as_str(), addr.port())).unwrap();
    Connection::connect(&cfg).await.unwrap()
}

#[tokio::test]
async fn scenario_1_basic_set_get_exists() {
    let conn = connect_with_script(vec![b"+OK\r\n", b"$3\r\nfoo\r\n", b":1\r\n"]).await;

    let ok = conn
        .execute("SET", [Arg::from("mykey"), Arg::from("foo")], ExecuteOptions::new())
        .unwrap()
        .await
        .unwrap();
    assert_eq!(ok, Value::Bool(true));

    let v = conn.execute("GET", [Arg::from("mykey")], ExecuteOptions::new()).unwrap().await.unwrap();
    assert_eq!(v, Value::Text("foo".into()));

    let n = conn.execute("EXISTS", [Arg::from("mykey")], ExecuteOptions::new()).unwrap().await.unwrap();
    assert_eq!(n, Value::Int(1));
}

#[tokio::test]
async fn scenario_2_pipeline() {
    // one flushed write carrying all four commands; one read back carrying all four replies.
    let conn = connect_with_script(vec![b"+OK\r\n+OK\r\n+OK\r\n$3\r\nfoo\r\n"]).await;

    let mut set_a = None;
    let mut set_b = None;
    let mut set_c = None;
    let mut get_a = None;

    conn.pipeline_scope(|scope| {
        set_a = Some(scope.execute("SET", [Arg::from("a"), Arg::from("foo")], ExecuteOptions::new()).unwrap());
        set_b = Some(scope.execute("SET", [Arg::from("b"), Arg::from("bar")], ExecuteOptions::new()).unwrap());
        set_c = Some(scope.execute("SET", [Arg::from("c"), Arg::from("baz")], ExecuteOptions::new()).unwrap());
        get_a = Some(scope.execute("GET", [Arg::from("a")], ExecuteOptions::new()).unwrap());
        async { Ok(()) }
    })
    .await
    .unwrap();

    assert_eq!(set_a.unwrap().await.unwrap(), Value::Bool(true));
    assert_eq!(set_b.unwrap().await.unwrap(), Value::Bool(true));
    assert_eq!(set_c.unwrap().await.unwrap(), Value::Bool(true));
    assert_eq!(get_a.unwrap().await.unwrap(), Value::Text("foo".into()));
}

#[tokio::test]
async fn scenario_3_transaction_with_watch_success() {
    let conn = connect_with_script(vec![
        b"+OK\r\n",             // SET mykey 1
        b"+OK\r\n",             // WATCH mykey
        b"$1\r\n1\r\n",         // GET mykey (read before committing the change)
        b"+OK\r\n+QUEUED\r\n*1\r\n+OK\r\n", // MULTI / SET mykey 2 (queued) / EXEC -> [OK]
        b"$1\r\n2\r\n",         // GET mykey, after the transaction
    ])
    .await;

    conn.execute("SET", [Arg::from("mykey"), Arg::from(1i64)], ExecuteOptions::new())
        .unwrap()
        .await
        .unwrap();

    let mut set_fut = None;
    conn.transaction_scope(["mykey"], |txn| async move {
        let before = txn.execute("GET", [Arg::from("mykey")], ExecuteOptions::new()).unwrap().await.unwrap();
        assert_eq!(before, Value::Text("1".into()));

        let mut inner = None;
        txn.pipeline_scope(|scope| {
            inner = Some(scope.execute("SET", [Arg::from("mykey"), Arg::from(2i64)], ExecuteOptions::new()).unwrap());
            async { Ok(()) }
        })
        .await?;

        set_fut = inner;
        Ok(())
    })
    .await
    .unwrap();

    assert_eq!(set_fut.unwrap().await.unwrap(), Value::Bool(true));

    let after = conn.execute("GET", [Arg::from("mykey")], ExecuteOptions::new()).unwrap().await.unwrap();
    assert_eq!(after, Value::Text("2".into()));
}

#[tokio::test]
async fn scenario_4_transaction_with_watch_conflict() {
    let conn = connect_with_script(vec![
        b"+OK\r\n",                         // SET mykey 1
        b"+OK\r\n",                         // WATCH mykey
        b"$1\r\n1\r\n",                     // GET mykey
        b"+OK\r\n+QUEUED\r\n*-1\r\n",       // MULTI / SET (queued) / EXEC -> nil: watched key was touched
        b"$3\r\nfoo\r\n",                   // GET mykey afterwards: the concurrent writer's value survives
    ])
    .await;

    conn.execute("SET", [Arg::from("mykey"), Arg::from(1i64)], ExecuteOptions::new())
        .unwrap()
        .await
        .unwrap();

    let mut set_fut = None;
    let result = conn
        .transaction_scope(["mykey"], |txn| async move {
            let before = txn.execute("GET", [Arg::from("mykey")], ExecuteOptions::new()).unwrap().await.unwrap();
            assert_eq!(before, Value::Text("1".into()));

            let mut inner = None;
            let r = txn
                .pipeline_scope(|scope| {
                    inner = Some(scope.execute("SET", [Arg::from("mykey"), Arg::from(2i64)], ExecuteOptions::new()).unwrap());
                    async { Ok(()) }
                })
                .await;

            set_fut = inner;
            r
        })
        .await;

    assert!(result.unwrap_err().is_watch_error());
    assert!(set_fut.unwrap().await.unwrap_err().is_watch_error());

    let after = conn.execute("GET", [Arg::from("mykey")], ExecuteOptions::new()).unwrap().await.unwrap();
    assert_eq!(after, Value::Text("foo".into()));
}

#[tokio::test]
async fn scenario_5_user_abort() {
    // the transaction never reaches the wire with any SET -- only EXISTS checks run, and the
    // transaction scope itself issues UNWATCH since the abort never entered a nested pipeline...
    // here the abort *does* go through a nested pipeline, so UNWATCH is the pipeline-exit path's
    // responsibility and is skipped per the disposition table (no watches were registered here,
    // so there is nothing to unwatch either way).
    let conn = connect_with_script(vec![
        b":0\r\n", // EXISTS a
        b":0\r\n", // EXISTS b
        b":0\r\n", // EXISTS c
    ])
    .await;

    conn.transaction_scope(Vec::<Box<[u8]>>::new(), |txn| async move {
        let result = txn
            .pipeline_scope(|scope| {
                let a = scope.execute("SET", [Arg::from("a"), Arg::from("1")], ExecuteOptions::new()).unwrap();
                let b = scope.execute("SET", [Arg::from("b"), Arg::from("1")], ExecuteOptions::new()).unwrap();
                let c = scope.execute("SET", [Arg::from("c"), Arg::from("1")], ExecuteOptions::new()).unwrap();
                async move {
                    assert!(a.await.unwrap_err().is_abort_transaction());
                    assert!(b.await.unwrap_err().is_abort_transaction());
                    assert!(c.await.unwrap_err().is_abort_transaction());
                    Err(xitca_redis::AbortTransaction.into())
                }
            })
            .await;
        // the abort is swallowed at the pipeline scope boundary: it resolves to Ok(()).
        assert!(result.is_ok());
        Ok(())
    })
    .await
    .unwrap();

    for key in ["a", "b", "c"] {
        let n = conn.execute("EXISTS", [Arg::from(key)], ExecuteOptions::new()).unwrap().await.unwrap();
        assert_eq!(n, Value::Int(0));
    }
}

#[tokio::test]
async fn scenario_6_await_inside_pipeline_is_guarded() {
    let conn = connect_with_script(vec![b"+OK\r\n"]).await;

    conn.pipeline_scope(|scope| {
        let fut = scope.execute("SET", [Arg::from("k"), Arg::from("v")], ExecuteOptions::new()).unwrap();
        async move {
            let err = fut.await.unwrap_err();
            assert!(err.is_pipeline_error());
            Ok(())
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn pipeline_scope_reusable_once_prior_scope_has_exited() {
    let conn = connect_with_script(vec![b"+OK\r\n"]).await;

    conn.pipeline_scope(|scope| {
        let _ = scope.execute("SET", [Arg::from("k"), Arg::from("v")], ExecuteOptions::new()).unwrap();
        async { Ok(()) }
    })
    .await
    .unwrap();

    // after the first scope has exited, entering a second is fine; what's rejected is a second
    // pipeline/transaction scope opened *while one is already in progress* -- see
    // `connection::test::nested_pipeline_scope_is_rejected_on_enter` and
    // `connection::test::nested_transaction_scope_is_rejected_on_enter` for that coverage.
    let _ = conn;
}

#[tokio::test]
async fn closed_connection_rejects_execute() {
    let conn = connect_with_script(vec![]).await;
    conn.close().await.unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(conn.is_closed());

    let err = conn.execute("PING", [], ExecuteOptions::new()).unwrap_err();
    assert!(err.is_connection_closed());
}
