//! Stitching of open outer member ways into closed rings.
//!
//! Boundary relations usually split a country's perimeter over many member
//! ways that share endpoints, including two-point segments where the border
//! is a straight line. When `merge_outer_ways` is enabled the builder joins
//! them here before polygon construction.

use std::collections::VecDeque;

use geo::Coord;

/// How an unused way attaches to the chain being grown
#[derive(Debug, Clone, Copy)]
enum Attach {
    /// Way starts at the chain's tail
    TailForward,
    /// Way ends at the chain's tail
    TailReversed,
    /// Way ends at the chain's head
    HeadForward,
    /// Way starts at the chain's head
    HeadReversed,
}

fn is_closed(chain: &VecDeque<Coord<f64>>) -> bool {
    chain.len() >= 4 && chain.front() == chain.back()
}

/// First unused way sharing an endpoint with the chain, tail before head.
fn find_neighbour(
    ways: &[Vec<Coord<f64>>],
    used: &[bool],
    chain: &VecDeque<Coord<f64>>,
) -> Option<(usize, Attach)> {
    let (head, tail) = (chain.front()?, chain.back()?);

    ways.iter().enumerate().find_map(|(i, way)| {
        if used[i] {
            return None;
        }
        let (first, last) = (way.first()?, way.last()?);
        if first == tail {
            Some((i, Attach::TailForward))
        } else if last == tail {
            Some((i, Attach::TailReversed))
        } else if last == head {
            Some((i, Attach::HeadForward))
        } else if first == head {
            Some((i, Attach::HeadReversed))
        } else {
            None
        }
    })
}

/// Join outer member ways that share endpoints, in either direction.
///
/// Ways are consumed in member order: each unused way seeds a chain that is
/// extended at both ends until it closes or nothing else connects. Open
/// chains are closed back to their first point. Only rings of at least 4
/// coordinates (3 distinct corners plus the closing point) are returned.
pub fn stitch_rings(ways: &[Vec<Coord<f64>>]) -> Vec<Vec<Coord<f64>>> {
    let mut used = vec![false; ways.len()];
    let mut rings = Vec::new();

    for seed in 0..ways.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;
        let mut chain: VecDeque<Coord<f64>> = ways[seed].iter().copied().collect();

        while !is_closed(&chain) {
            let Some((next, attach)) = find_neighbour(ways, &used, &chain) else {
                break;
            };
            used[next] = true;
            let way = &ways[next];

            // The shared endpoint is already in the chain
            match attach {
                Attach::TailForward => chain.extend(way.iter().skip(1).copied()),
                Attach::TailReversed => chain.extend(way.iter().rev().skip(1).copied()),
                Attach::HeadForward => {
                    for c in way.iter().rev().skip(1) {
                        chain.push_front(*c);
                    }
                }
                Attach::HeadReversed => {
                    for c in way.iter().skip(1) {
                        chain.push_front(*c);
                    }
                }
            }
        }

        if chain.len() < 3 {
            continue;
        }
        if chain.front() != chain.back() {
            if let Some(&first) = chain.front() {
                chain.push_back(first);
            }
        }
        if chain.len() >= 4 {
            rings.push(chain.into_iter().collect());
        }
    }

    rings
}
