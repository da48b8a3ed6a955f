use crate::trace::MemoryRequest;

/// Size in bytes of one matrix element
const ELEMENT_BYTES: u32 = 4;

/// Generates the memory requests of a naive `n x n` matrix multiplication, `C = A * B`
///
/// A, B and C are laid out one after the other from address 0, row major. A holds `1..=n*n` and B
/// is the identity, so C ends up equal to A. The trace first writes A, B and C element by element,
/// then for every element of C reads the row of A and column of B it needs and writes the result,
/// and finally reads all of C back.
///
/// With `with_expected`, reads carry the value they must return, for use with verify mode
///
/// # Examples
///
/// ```
/// use hiercache::workload::matrix_multiplication;
/// // 3 * n^2 initial writes, 2 * n^3 reads and n^2 writes, n^2 final reads
/// assert_eq!(matrix_multiplication(4, false).len(), 3 * 16 + 2 * 64 + 16 + 16);
/// ```
pub fn matrix_multiplication(n: u32, with_expected: bool) -> Vec<MemoryRequest> {
    let base_a = 0;
    let base_b = base_a + n * n * ELEMENT_BYTES;
    let base_c = base_b + n * n * ELEMENT_BYTES;
    let address = |base: u32, i: u32, j: u32| base + (i * n + j) * ELEMENT_BYTES;
    let a = |i: u32, j: u32| n * i + j + 1;
    let b = |i: u32, j: u32| u32::from(i == j);
    let read = |address: u32, expected: u32| {
        if with_expected {
            MemoryRequest::read_expecting(address, expected)
        } else {
            MemoryRequest::read(address)
        }
    };

    let n2 = (n * n) as usize;
    let mut requests = Vec::with_capacity(3 * n2 + 2 * n2 * n as usize + 2 * n2);
    for i in 0..n {
        for j in 0..n {
            requests.push(MemoryRequest::write(address(base_a, i, j), a(i, j)));
            requests.push(MemoryRequest::write(address(base_b, i, j), b(i, j)));
            requests.push(MemoryRequest::write(address(base_c, i, j), 0));
        }
    }

    let mut c = vec![0u32; n2];
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0u32;
            for k in 0..n {
                requests.push(read(address(base_a, i, k), a(i, k)));
                requests.push(read(address(base_b, k, j), b(k, j)));
                sum = sum.wrapping_add(a(i, k).wrapping_mul(b(k, j)));
            }
            c[(i * n + j) as usize] = sum;
            requests.push(MemoryRequest::write(address(base_c, i, j), sum));
        }
    }

    for i in 0..n {
        for j in 0..n {
            requests.push(read(address(base_c, i, j), c[(i * n + j) as usize]));
        }
    }
    requests
}

/// Renders requests as trace file text, one row per line
pub fn to_csv(requests: &[MemoryRequest]) -> String {
    requests
        .iter()
        .map(|request| request.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
